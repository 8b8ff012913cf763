//! Client side of the handshake.
//!
//! One `Client` drives one connection attempt over a record transport. On
//! any failure the peer gets a fatal alert and the cached session for this
//! peer is dropped, so a poisoned session is never offered again.

use ring::rand::SecureRandom;
use std::time::SystemTime;

use crate::alert::{self, AlertDescription, AlertLevel};
use crate::cipher::{self, CipherSuiteId};
use crate::crypto::{self, ConnectionEnd};
use crate::digest::TranscriptDigest;
use crate::errors::TlsError;
use crate::extensions::{ExtensionList, CURVE_SECP256R1, CURVE_SECP384R1};
use crate::fields::Random;
use crate::handshake::{
    self, CertificateChainMsg, ClientHello, ClientKeyExchange, Finished, HandshakeType,
    MessageStream, NegotiatedParameters, RawMessage, SessionId,
};
use crate::keyexchange;
use crate::pack::Pack;
use crate::record::{self, ContentType, ProtocolVersion, CHANGE_CIPHER_SPEC_BODY};
use crate::session::{Session, SessionCache};
use crate::transport::record_layer::RecordLayer;
use crate::truststore::TrustStore;
use crate::verify;
use crate::x509::Certificate;

pub struct Client<'a> {
    transport: &'a mut dyn RecordLayer,
    trust_store: &'a dyn TrustStore,
    session_cache: &'a SessionCache,
    rand: &'a dyn SecureRandom,
    host: String,
    port: u16,
    proposed_version: ProtocolVersion,
}

impl<'a> Client<'a> {
    pub fn new(
        transport: &'a mut dyn RecordLayer,
        trust_store: &'a dyn TrustStore,
        session_cache: &'a SessionCache,
        rand: &'a dyn SecureRandom,
        host: &str,
        port: u16,
        proposed_version: ProtocolVersion,
    ) -> Client<'a> {
        Client {
            transport,
            trust_store,
            session_cache,
            rand,
            host: host.to_string(),
            port,
            proposed_version,
        }
    }

    pub fn handshake(&mut self) -> Result<NegotiatedParameters, TlsError> {
        match self.run() {
            Ok(parameters) => Ok(parameters),
            Err(err) => {
                // The alert is best-effort, the transport may already be gone.
                let _ = self
                    .transport
                    .send_alert(AlertLevel::Fatal, alert::description_for(&err));
                self.session_cache.delete(&self.host, self.port, &[]);
                Err(err)
            }
        }
    }

    fn run(&mut self) -> Result<NegotiatedParameters, TlsError> {
        let cached = self.session_cache.get_by_peer(&self.host, self.port);
        let client_random = Random::new(self.rand)?;
        let offered = cipher::client_offer();

        // SSLv3 servers predate extensions, only advertise them on TLS.
        let extensions = if self.proposed_version.is_tls() {
            let mut list = ExtensionList::empty();
            list.push_supported_curves(&[CURVE_SECP256R1, CURVE_SECP384R1]);
            list.push_ec_point_formats();
            Some(list)
        } else {
            None
        };

        let hello = ClientHello {
            version: self.proposed_version,
            random: client_random,
            session_id: SessionId(cached.as_ref().map(|s| s.id.clone()).unwrap_or_default()),
            cipher_suites: offered.clone(),
            compression_methods: vec![0],
            extensions,
        };

        let mut transcript = TranscriptDigest::new();
        let mut stream = MessageStream::new();
        self.send_message(&mut transcript, HandshakeType::ClientHello, &hello.pack())?;

        let server_hello = self.read_server_hello(&mut stream, &mut transcript)?;
        let negotiated = self.check_server_version(server_hello.version)?;
        if !offered.contains(&server_hello.cipher_suite) {
            return Err(TlsError::CipherNotOfferedError(server_hello.cipher_suite));
        }
        if server_hello.compression_method != 0 {
            return Err(TlsError::InvalidCompressionMethodError);
        }
        let suite = server_hello.cipher_suite;
        let server_random = server_hello.random;
        let session_id = server_hello.session_id.0;

        let resumed = match &cached {
            Some(session) => !session.id.is_empty() && session.id == session_id,
            None => false,
        };
        if resumed {
            let cached = cached.ok_or(TlsError::UnexpectedMessageError("missing session"))?;
            self.finish_resumed(
                &mut stream,
                &mut transcript,
                negotiated,
                suite,
                &client_random,
                &server_random,
                &cached,
            )?;
            return Ok(NegotiatedParameters {
                version: negotiated,
                cipher_suite: suite,
                session_id,
                resumed: true,
                peer_subject: cached.peer_certificate.as_ref().map(|c| c.subject.clone()),
            });
        }

        let chain = self.read_certificate_chain(&mut stream, &mut transcript)?;
        let parameters = cipher::parameters(suite)?;
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs();
        verify::verify_chain(
            &chain,
            now,
            Some(parameters.key_exchange.required_key_usage()),
            None,
            self.trust_store,
        )?;
        let leaf = &chain[0];
        if !leaf.host_matches(&self.host) {
            return Err(TlsError::HostnameMismatchError(self.host.clone()));
        }

        let certificate_requested = self.read_to_hello_done(&mut stream, &mut transcript)?;
        if certificate_requested {
            // Declining with a warning alert, the SSLv3 convention, which
            // TLS servers for this profile also accept.
            self.transport
                .send_alert(AlertLevel::Warning, AlertDescription::NoCertificate)?;
        }

        let (premaster, exchange) = keyexchange::client_premaster(
            parameters.key_exchange,
            self.proposed_version,
            negotiated,
            &leaf.public_key,
            self.rand,
        )?;
        self.send_message(
            &mut transcript,
            HandshakeType::ClientKeyExchange,
            &ClientKeyExchange { exchange }.pack(),
        )?;

        let master = crypto::master_secret(negotiated, &premaster, &client_random.0, &server_random.0);
        self.transport.init_keys(
            ConnectionEnd::Client,
            suite,
            &client_random,
            &server_random,
            &master,
        )?;

        self.transport
            .write_record(ContentType::ChangeCipherSpec, &CHANGE_CIPHER_SPEC_BODY)?;
        let verify_data =
            crypto::finished_verify_data(negotiated, &master, ConnectionEnd::Client, transcript.snapshot());
        self.send_message(
            &mut transcript,
            HandshakeType::Finished,
            &Finished { verify_data }.pack(),
        )?;

        let expected = crypto::finished_verify_data(
            negotiated,
            &master,
            ConnectionEnd::Server,
            transcript.snapshot(),
        );
        self.read_change_cipher_spec()?;
        self.read_finished(&mut stream, &mut transcript, &expected)?;

        if !session_id.is_empty() {
            self.session_cache.add(Session::new(
                &self.host,
                self.port,
                session_id.clone(),
                &master,
                Some(leaf.clone()),
            ));
        }

        Ok(NegotiatedParameters {
            version: negotiated,
            cipher_suite: suite,
            session_id,
            resumed: false,
            peer_subject: Some(leaf.subject.clone()),
        })
    }

    fn send_message(
        &mut self,
        transcript: &mut TranscriptDigest,
        msg_type: HandshakeType,
        body: &[u8],
    ) -> Result<(), TlsError> {
        let framed = handshake::frame(msg_type, body)?;
        transcript.update(&framed);
        self.transport.write_record(ContentType::Handshake, &framed)
    }

    /// HelloRequests may appear between any two handshake messages and are
    /// ignored without entering the transcript.
    fn next_handshake(&mut self, stream: &mut MessageStream) -> Result<RawMessage, TlsError> {
        loop {
            let message = stream.next(self.transport)?;
            if message.msg_type != HandshakeType::HelloRequest {
                return Ok(message);
            }
        }
    }

    fn read_server_hello(
        &mut self,
        stream: &mut MessageStream,
        transcript: &mut TranscriptDigest,
    ) -> Result<handshake::ServerHello, TlsError> {
        let message = self.next_handshake(stream)?;
        if message.msg_type != HandshakeType::ServerHello {
            return Err(TlsError::UnexpectedMessageError("expected ServerHello"));
        }
        transcript.update(&message.bytes);
        let mut hello = handshake::ServerHello::empty();
        hello.unpack(&mut message.body().to_vec())?;
        Ok(hello)
    }

    fn check_server_version(&self, version: ProtocolVersion) -> Result<ProtocolVersion, TlsError> {
        let (major, minor) = version.tuple();
        if version.tuple() < record::SSL_3_0.tuple() || version.tuple() > self.proposed_version.tuple()
        {
            return Err(TlsError::UnsupportedVersionError(major, minor));
        }
        Ok(version)
    }

    fn read_certificate_chain(
        &mut self,
        stream: &mut MessageStream,
        transcript: &mut TranscriptDigest,
    ) -> Result<Vec<Certificate>, TlsError> {
        let message = self.next_handshake(stream)?;
        if message.msg_type != HandshakeType::Certificate {
            return Err(TlsError::UnexpectedMessageError("expected Certificate"));
        }
        transcript.update(&message.bytes);
        let mut chain_msg = CertificateChainMsg::empty();
        chain_msg.unpack(&mut message.body().to_vec())?;
        let mut chain = Vec::with_capacity(chain_msg.ders.len());
        for der in &chain_msg.ders {
            chain.push(Certificate::from_der(der)?);
        }
        if chain.is_empty() {
            return Err(TlsError::CertificateRequiredError);
        }
        Ok(chain)
    }

    /// Consume messages up to ServerHelloDone. A ServerKeyExchange is an
    /// error under the static key exchanges this profile supports.
    fn read_to_hello_done(
        &mut self,
        stream: &mut MessageStream,
        transcript: &mut TranscriptDigest,
    ) -> Result<bool, TlsError> {
        let mut certificate_requested = false;
        loop {
            let message = self.next_handshake(stream)?;
            transcript.update(&message.bytes);
            match message.msg_type {
                HandshakeType::CertificateRequest => certificate_requested = true,
                HandshakeType::ServerHelloDone => {
                    if !message.body().is_empty() {
                        return Err(TlsError::InvalidLengthError);
                    }
                    return Ok(certificate_requested);
                }
                HandshakeType::ServerKeyExchange => {
                    return Err(TlsError::UnexpectedMessageError(
                        "ServerKeyExchange with static key exchange",
                    ))
                }
                _ => return Err(TlsError::UnexpectedMessageError("expected ServerHelloDone")),
            }
        }
    }

    fn read_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        let body = self.transport.read_record(ContentType::ChangeCipherSpec)?;
        if body != CHANGE_CIPHER_SPEC_BODY {
            return Err(TlsError::DecodeError("ChangeCipherSpec body"));
        }
        Ok(())
    }

    fn read_finished(
        &mut self,
        stream: &mut MessageStream,
        transcript: &mut TranscriptDigest,
        expected: &[u8],
    ) -> Result<(), TlsError> {
        let message = self.next_handshake(stream)?;
        if message.msg_type != HandshakeType::Finished {
            return Err(TlsError::UnexpectedMessageError("expected Finished"));
        }
        transcript.update(&message.bytes);
        if message.body() != expected {
            return Err(TlsError::VerificationFailedError);
        }
        Ok(())
    }

    /// Abbreviated handshake: the server's ChangeCipherSpec and Finished
    /// come first, then ours.
    fn finish_resumed(
        &mut self,
        stream: &mut MessageStream,
        transcript: &mut TranscriptDigest,
        negotiated: ProtocolVersion,
        suite: CipherSuiteId,
        client_random: &Random,
        server_random: &Random,
        session: &Session,
    ) -> Result<(), TlsError> {
        self.transport.init_keys(
            ConnectionEnd::Client,
            suite,
            client_random,
            server_random,
            &session.master_secret,
        )?;

        let expected = crypto::finished_verify_data(
            negotiated,
            &session.master_secret,
            ConnectionEnd::Server,
            transcript.snapshot(),
        );
        self.read_change_cipher_spec()?;
        self.read_finished(stream, transcript, &expected)?;

        self.transport
            .write_record(ContentType::ChangeCipherSpec, &CHANGE_CIPHER_SPEC_BODY)?;
        let verify_data = crypto::finished_verify_data(
            negotiated,
            &session.master_secret,
            ConnectionEnd::Client,
            transcript.snapshot(),
        );
        self.send_message(
            transcript,
            HandshakeType::Finished,
            &Finished { verify_data }.pack(),
        )
    }
}
