//! Server side of the handshake.

use ring::rand::SecureRandom;

use crate::alert::{self, AlertLevel};
use crate::cipher::{self, CipherSuiteId, KeyExchangeKind};
use crate::crypto::{self, ConnectionEnd};
use crate::digest::TranscriptDigest;
use crate::errors::TlsError;
use crate::fields::Random;
use crate::handshake::{
    self, CertificateChainMsg, ClientHello, Finished, HandshakeType, MessageStream,
    NegotiatedParameters, SessionId,
};
use crate::keyexchange;
use crate::pack::Pack;
use crate::record::{self, ContentType, ProtocolVersion, CHANGE_CIPHER_SPEC_BODY};
use crate::rsa::RsaPrivateKey;
use crate::session::{Session, SessionCache};
use crate::transport::record_layer::RecordLayer;

const SESSION_ID_LENGTH: usize = 32;

/// Key material the server presents: a leaf-first DER chain and the leaf's
/// RSA private key.
pub struct ServerConfig {
    pub certificate_chain: Vec<Vec<u8>>,
    pub private_key: RsaPrivateKey,
}

pub struct Server<'a> {
    transport: &'a mut dyn RecordLayer,
    config: &'a ServerConfig,
    session_cache: &'a SessionCache,
    rand: &'a dyn SecureRandom,
}

impl<'a> Server<'a> {
    pub fn new(
        transport: &'a mut dyn RecordLayer,
        config: &'a ServerConfig,
        session_cache: &'a SessionCache,
        rand: &'a dyn SecureRandom,
    ) -> Server<'a> {
        Server {
            transport,
            config,
            session_cache,
            rand,
        }
    }

    pub fn handshake(&mut self) -> Result<NegotiatedParameters, TlsError> {
        let mut tentative_id = None;
        match self.run(&mut tentative_id) {
            Ok(parameters) => Ok(parameters),
            Err(err) => {
                let _ = self
                    .transport
                    .send_alert(AlertLevel::Fatal, alert::description_for(&err));
                // A session that failed to resume must not be offered again.
                if let Some(id) = tentative_id {
                    self.session_cache.delete("", 0, &id);
                }
                Err(err)
            }
        }
    }

    fn run(&mut self, tentative_id: &mut Option<Vec<u8>>) -> Result<NegotiatedParameters, TlsError> {
        let mut transcript = TranscriptDigest::new();
        let mut stream = MessageStream::new();

        let message = stream.next(self.transport)?;
        if message.msg_type != HandshakeType::ClientHello {
            return Err(TlsError::UnexpectedMessageError("expected ClientHello"));
        }
        transcript.update(&message.bytes);
        let mut hello = ClientHello::empty();
        hello.unpack(&mut message.body().to_vec())?;

        let client_proposed = hello.version;
        let (major, minor) = client_proposed.tuple();
        if client_proposed.tuple() < record::SSL_3_0.tuple() {
            return Err(TlsError::UnsupportedVersionError(major, minor));
        }
        let negotiated = if client_proposed.tuple() >= record::TLS_1_0.tuple() {
            record::TLS_1_0
        } else {
            record::SSL_3_0
        };

        if !hello.compression_methods.contains(&0) {
            return Err(TlsError::InvalidCompressionMethodError);
        }
        let suite = self.select_suite(&hello.cipher_suites)?;

        let client_random = hello.random;
        let server_random = Random::new(self.rand)?;

        let resumable = if hello.session_id.0.is_empty() {
            None
        } else {
            self.session_cache.get_by_id(&hello.session_id.0)
        };

        if let Some(session) = resumable {
            let session_id = session.id.clone();
            *tentative_id = Some(session_id.clone());
            self.send_server_hello(
                &mut transcript,
                negotiated,
                &server_random,
                &session_id,
                suite,
            )?;
            self.finish_resumed(
                &mut stream,
                &mut transcript,
                negotiated,
                suite,
                &client_random,
                &server_random,
                &session,
            )?;
            return Ok(NegotiatedParameters {
                version: negotiated,
                cipher_suite: suite,
                session_id,
                resumed: true,
                peer_subject: None,
            });
        }

        let mut session_id = vec![0u8; SESSION_ID_LENGTH];
        self.rand
            .fill(&mut session_id)
            .map_err(|_| TlsError::UnspecifiedRingError)?;

        self.send_server_hello(&mut transcript, negotiated, &server_random, &session_id, suite)?;
        let chain_msg = CertificateChainMsg {
            ders: self.config.certificate_chain.clone(),
        };
        self.send_message(&mut transcript, HandshakeType::Certificate, &chain_msg.pack())?;
        self.send_message(&mut transcript, HandshakeType::ServerHelloDone, &[])?;

        let message = stream.next(self.transport)?;
        if message.msg_type != HandshakeType::ClientKeyExchange {
            return Err(TlsError::UnexpectedMessageError("expected ClientKeyExchange"));
        }
        transcript.update(&message.bytes);
        let premaster = keyexchange::server_premaster_rsa(
            &self.config.private_key,
            negotiated,
            client_proposed,
            message.body(),
        )?;

        let master =
            crypto::master_secret(negotiated, &premaster, &client_random.0, &server_random.0);
        self.transport.init_keys(
            ConnectionEnd::Server,
            suite,
            &client_random,
            &server_random,
            &master,
        )?;

        let expected = crypto::finished_verify_data(
            negotiated,
            &master,
            ConnectionEnd::Client,
            transcript.snapshot(),
        );
        self.read_change_cipher_spec()?;
        self.read_finished(&mut stream, &mut transcript, &expected)?;

        self.transport
            .write_record(ContentType::ChangeCipherSpec, &CHANGE_CIPHER_SPEC_BODY)?;
        let verify_data = crypto::finished_verify_data(
            negotiated,
            &master,
            ConnectionEnd::Server,
            transcript.snapshot(),
        );
        self.send_message(
            &mut transcript,
            HandshakeType::Finished,
            &Finished { verify_data }.pack(),
        )?;

        self.session_cache
            .add(Session::new("", 0, session_id.clone(), &master, None));

        Ok(NegotiatedParameters {
            version: negotiated,
            cipher_suite: suite,
            session_id,
            resumed: false,
            peer_subject: None,
        })
    }

    /// First suite in preference order the client also offered. ECDH needs
    /// an EC certificate key, which this config cannot hold, so only the RSA
    /// suites are eligible.
    fn select_suite(&self, offered: &[CipherSuiteId]) -> Result<CipherSuiteId, TlsError> {
        for suite in cipher::SERVER_PREFERENCE.iter() {
            let parameters = cipher::parameters(*suite)?;
            if parameters.key_exchange == KeyExchangeKind::Ecdh {
                continue;
            }
            if offered.contains(suite) {
                return Ok(*suite);
            }
        }
        Err(TlsError::NoCommonCiphersError)
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

    fn send_server_hello(
        &mut self,
        transcript: &mut TranscriptDigest,
        negotiated: ProtocolVersion,
        server_random: &Random,
        session_id: &[u8],
        suite: CipherSuiteId,
    ) -> Result<(), TlsError> {
        let hello = handshake::ServerHello {
            version: negotiated,
            random: *server_random,
            session_id: SessionId(session_id.to_vec()),
            cipher_suite: suite,
            compression_method: 0,
        };
        self.send_message(transcript, HandshakeType::ServerHello, &hello.pack())
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
        let message = stream.next(self.transport)?;
        if message.msg_type != HandshakeType::Finished {
            return Err(TlsError::UnexpectedMessageError("expected Finished"));
        }
        transcript.update(&message.bytes);
        if message.body() != expected {
            return Err(TlsError::VerificationFailedError);
        }
        Ok(())
    }

    /// Abbreviated handshake: our ChangeCipherSpec and Finished go first.
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
            ConnectionEnd::Server,
            suite,
            client_random,
            server_random,
            &session.master_secret,
        )?;

        self.transport
            .write_record(ContentType::ChangeCipherSpec, &CHANGE_CIPHER_SPEC_BODY)?;
        let verify_data = crypto::finished_verify_data(
            negotiated,
            &session.master_secret,
            ConnectionEnd::Server,
            transcript.snapshot(),
        );
        self.send_message(
            transcript,
            HandshakeType::Finished,
            &Finished { verify_data }.pack(),
        )?;

        let expected = crypto::finished_verify_data(
            negotiated,
            &session.master_secret,
            ConnectionEnd::Client,
            transcript.snapshot(),
        );
        self.read_change_cipher_spec()?;
        self.read_finished(stream, transcript, &expected)
    }
}
