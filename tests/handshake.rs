//! End-to-end handshakes over the loopback transport, plus chain
//! verification against certificates assembled by the in-test DER builder.

use std::sync::Arc;
use std::thread;

use ring::rand::SystemRandom;
use sha1::{Digest, Sha1};

use tinytls::client::Client;
use tinytls::errors::TlsError;
use tinytls::handshake::NegotiatedParameters;
use tinytls::record::{self, ContentType, ProtocolVersion};
use tinytls::rsa::RsaPrivateKey;
use tinytls::server::{Server, ServerConfig};
use tinytls::session::{Session, SessionCache};
use tinytls::transport::loopback;
use tinytls::transport::record_layer::RecordLayer;
use tinytls::truststore::TrustAnchors;
use tinytls::verify;
use tinytls::x509::{self, Certificate};
use tinytls::{cipher, fields};

// 512-bit fixture keypairs. A signs the root, B and C serve as
// intermediate and leaf keys where chains need distinct ones.
const KEY_A_N: &str = "8bfcca280212d131e0ce247d48b581ca0af6a932f773eae5cf6095b31cf829cc\
                       4bb139b13f6cc0c50ba796e2ec69aa2201caa21372517fcef764e6ebf01ecebf";
const KEY_A_D: &str = "4520a90786b69a1d626109bde068d955d78224dda93ad1d57849bec2fb5c44ef\
                       04f9cc3b523f1814a2ad81fc57db41494846de7048ad7f5079fa66ca77d40c41";
const KEY_B_N: &str = "b4124218a00c063f4d08db918d4ac9e1e7c0d81ae67269a944cc967706660e3a\
                       eca3b969c5180d4f4814134d5eada7cd0254c35b991db06f985ac31a2e87b6f7";
const KEY_B_D: &str = "3fd48507739c2f8ebac0dc0c2138948d76783e6272b3b5cea1ab9fde7b2f2bf5\
                       90faa350eee2063967dd881190d43520d406694ea56369e21bdae84b2fc79b01";
const KEY_C_N: &str = "d3e75efaa970894525ec8455cc636a2db575e932217432dbbb646791444100ff\
                       84e7727e17011a154b76249547f9746909f811fdd09dbddb55ce458f1c641d89";
const KEY_C_D: &str = "8ade75232649a6dc1717623e6c1cb6a7cfe4bef7686f2329572c5ca719a8d402\
                       6e172c65f837d994be357c09e9067918bf57a319f69bba8974e08cac42f05211";

const RSA_E: &[u8] = &[0x01, 0x00, 0x01];

struct KeyPair {
    modulus: Vec<u8>,
    private: RsaPrivateKey,
}

fn keypair(n: &str, d: &str) -> KeyPair {
    let modulus = hex::decode(n).unwrap();
    KeyPair {
        private: RsaPrivateKey::from_components(&modulus, &hex::decode(d).unwrap()).unwrap(),
        modulus,
    }
}

// Minimal DER assembly, enough to emit v3 certificates.

fn der(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = contents.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x100 {
        out.push(0x81);
        out.push(len as u8);
    } else {
        out.push(0x82);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
    out.extend_from_slice(contents);
    out
}

fn der_integer(bytes: &[u8]) -> Vec<u8> {
    let mut contents = Vec::new();
    if bytes.first().map_or(true, |b| b & 0x80 != 0) {
        contents.push(0);
    }
    contents.extend_from_slice(bytes);
    der(0x02, &contents)
}

fn der_name(cn: &str) -> Vec<u8> {
    let attribute = der(
        0x30,
        &[der(0x06, &[0x55, 0x04, 0x03]), der(0x0c, cn.as_bytes())].concat(),
    );
    der(0x30, &der(0x31, &attribute))
}

fn der_utctime(stamp: &str) -> Vec<u8> {
    assert_eq!(stamp.len(), 13);
    der(0x17, stamp.as_bytes())
}

fn sha1_with_rsa() -> Vec<u8> {
    der(
        0x30,
        &[
            der(0x06, &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x05]),
            der(0x05, &[]),
        ]
        .concat(),
    )
}

fn der_spki(modulus: &[u8]) -> Vec<u8> {
    let algorithm = der(
        0x30,
        &[
            der(0x06, &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01]),
            der(0x05, &[]),
        ]
        .concat(),
    );
    let key = der(0x30, &[der_integer(modulus), der_integer(RSA_E)].concat());
    let mut bits = vec![0u8];
    bits.extend_from_slice(&key);
    der(0x30, &[algorithm, der(0x03, &bits)].concat())
}

fn basic_constraints(ca: bool, path_len: Option<u8>) -> Vec<u8> {
    let mut inner = Vec::new();
    if ca {
        inner.extend_from_slice(&der(0x01, &[0xff]));
    }
    if let Some(path_len) = path_len {
        inner.extend_from_slice(&der_integer(&[path_len]));
    }
    der(
        0x30,
        &[
            der(0x06, &[0x55, 0x1d, 0x13]),
            der(0x01, &[0xff]),
            der(0x04, &der(0x30, &inner)),
        ]
        .concat(),
    )
}

struct CertBuilder<'a> {
    subject_cn: &'a str,
    issuer_cn: &'a str,
    serial: u8,
    subject_modulus: &'a [u8],
    basic_constraints: Option<bool>,
    path_len: Option<u8>,
    not_after: &'a str,
}

impl<'a> CertBuilder<'a> {
    fn build(&self, issuer_key: &RsaPrivateKey) -> Vec<u8> {
        let mut tbs = Vec::new();
        tbs.extend_from_slice(&der(0xa0, &der_integer(&[0x02])));
        tbs.extend_from_slice(&der_integer(&[self.serial]));
        tbs.extend_from_slice(&sha1_with_rsa());
        tbs.extend_from_slice(&der_name(self.issuer_cn));
        tbs.extend_from_slice(&der(
            0x30,
            &[der_utctime("200101000000Z"), der_utctime(self.not_after)].concat(),
        ));
        tbs.extend_from_slice(&der_name(self.subject_cn));
        tbs.extend_from_slice(&der_spki(self.subject_modulus));
        if let Some(ca) = self.basic_constraints {
            let extensions = der(0x30, &basic_constraints(ca, self.path_len));
            tbs.extend_from_slice(&der(0xa3, &extensions));
        }
        let tbs = der(0x30, &tbs);

        let digest = Sha1::digest(&tbs);
        let signature = issuer_key.sign_pkcs1(&digest).unwrap();
        let mut bits = vec![0u8];
        bits.extend_from_slice(&signature);
        der(0x30, &[tbs, sha1_with_rsa(), der(0x03, &bits)].concat())
    }
}

/// Root CA on key A and a server leaf on key B, for "test.gateway.example".
fn server_credentials() -> (Vec<u8>, Vec<u8>, KeyPair) {
    let root_key = keypair(KEY_A_N, KEY_A_D);
    let leaf_key = keypair(KEY_B_N, KEY_B_D);
    let root = CertBuilder {
        subject_cn: "Test Root CA",
        issuer_cn: "Test Root CA",
        serial: 1,
        subject_modulus: &root_key.modulus,
        basic_constraints: Some(true),
        path_len: Some(1),
        not_after: "400101000000Z",
    }
    .build(&root_key.private);
    let leaf = CertBuilder {
        subject_cn: "test.gateway.example",
        issuer_cn: "Test Root CA",
        serial: 2,
        subject_modulus: &leaf_key.modulus,
        basic_constraints: None,
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&root_key.private);
    (root, leaf, leaf_key)
}

// Raw handshake framing for tests that script one side of the exchange
// directly over the transport.

fn frame_message(msg_type: u8, body: &[u8]) -> Vec<u8> {
    let mut message = vec![msg_type];
    message.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    message.extend_from_slice(body);
    message
}

fn certificate_message(ders: &[&[u8]]) -> Vec<u8> {
    let mut list = Vec::new();
    for der in ders {
        list.extend_from_slice(&(der.len() as u32).to_be_bytes()[1..]);
        list.extend_from_slice(der);
    }
    let mut body = (list.len() as u32).to_be_bytes()[1..].to_vec();
    body.extend_from_slice(&list);
    body
}

struct HandshakeOutcome {
    client: Result<NegotiatedParameters, TlsError>,
    server: Result<NegotiatedParameters, TlsError>,
    client_master: Option<Vec<u8>>,
    client_key_block: Option<Vec<u8>>,
    server_master: Option<Vec<u8>>,
    server_key_block: Option<Vec<u8>>,
}

fn run_handshake(
    record_version: ProtocolVersion,
    proposed: ProtocolVersion,
    host: &str,
    trust: &TrustAnchors,
    client_cache: &SessionCache,
    server_cache: &Arc<SessionCache>,
    config: &Arc<ServerConfig>,
) -> HandshakeOutcome {
    let (mut client_end, mut server_end) = loopback::pair(record_version);

    let server_cache = Arc::clone(server_cache);
    let config = Arc::clone(config);
    let server_thread = thread::spawn(move || {
        let rand = SystemRandom::new();
        let result = Server::new(&mut server_end, &config, &server_cache, &rand).handshake();
        (result, server_end)
    });

    let rand = SystemRandom::new();
    let client = Client::new(
        &mut client_end,
        trust,
        client_cache,
        &rand,
        host,
        4433,
        proposed,
    )
    .handshake();

    let (server, server_end) = server_thread.join().unwrap();
    HandshakeOutcome {
        client,
        server,
        client_master: client_end
            .installed_keys()
            .map(|k| k.master_secret.to_vec()),
        client_key_block: client_end.installed_keys().map(|k| k.key_block.to_vec()),
        server_master: server_end
            .installed_keys()
            .map(|k| k.master_secret.to_vec()),
        server_key_block: server_end.installed_keys().map(|k| k.key_block.to_vec()),
    }
}

fn test_setup() -> (TrustAnchors, Arc<ServerConfig>) {
    let (root, leaf, leaf_key) = server_credentials();
    let trust = TrustAnchors::new();
    trust.install("test-root", 0, Certificate::from_der(&root).unwrap());
    let config = Arc::new(ServerConfig {
        certificate_chain: vec![leaf, root],
        private_key: leaf_key.private,
    });
    (trust, config)
}

#[test]
fn full_handshake_then_resumption() {
    let (trust, config) = test_setup();
    let client_cache = SessionCache::new();
    let server_cache = Arc::new(SessionCache::new());

    let first = run_handshake(
        record::TLS_1_0,
        record::TLS_1_0,
        "test.gateway.example",
        &trust,
        &client_cache,
        &server_cache,
        &config,
    );
    let client_params = first.client.unwrap();
    let server_params = first.server.unwrap();
    assert_eq!(client_params.version, record::TLS_1_0);
    assert_eq!(client_params.cipher_suite, cipher::TLS_RSA_WITH_RC4_128_SHA);
    assert!(!client_params.resumed);
    assert!(!server_params.resumed);
    assert_eq!(client_params.session_id, server_params.session_id);
    assert_eq!(
        client_params.peer_subject.as_deref(),
        Some("CN=test.gateway.example")
    );

    assert_eq!(first.client_master, first.server_master);
    assert_eq!(first.client_key_block, first.server_key_block);
    let first_master = first.client_master.clone().unwrap();

    let second = run_handshake(
        record::TLS_1_0,
        record::TLS_1_0,
        "test.gateway.example",
        &trust,
        &client_cache,
        &server_cache,
        &config,
    );
    let client_params = second.client.unwrap();
    let server_params = second.server.unwrap();
    assert!(client_params.resumed);
    assert!(server_params.resumed);

    // Resumption reuses the master secret but fresh randoms change the key
    // block, and both sides still agree on it.
    assert_eq!(second.client_master.as_ref().unwrap(), &first_master);
    assert_eq!(second.client_master, second.server_master);
    assert_eq!(second.client_key_block, second.server_key_block);
    assert_ne!(second.client_key_block, first.client_key_block);
}

#[test]
fn ssl3_full_handshake() {
    let (trust, config) = test_setup();
    let client_cache = SessionCache::new();
    let server_cache = Arc::new(SessionCache::new());

    let outcome = run_handshake(
        record::SSL_3_0,
        record::SSL_3_0,
        "test.gateway.example",
        &trust,
        &client_cache,
        &server_cache,
        &config,
    );
    let client_params = outcome.client.unwrap();
    assert_eq!(client_params.version, record::SSL_3_0);
    assert!(!client_params.resumed);
    assert_eq!(outcome.client_master, outcome.server_master);
    assert_eq!(outcome.client_key_block, outcome.server_key_block);
}

#[test]
fn unknown_ca_aborts_with_alert() {
    let (_, config) = test_setup();
    let empty_trust = TrustAnchors::new();
    let client_cache = SessionCache::new();
    let server_cache = Arc::new(SessionCache::new());

    let outcome = run_handshake(
        record::TLS_1_0,
        record::TLS_1_0,
        "test.gateway.example",
        &empty_trust,
        &client_cache,
        &server_cache,
        &config,
    );
    assert!(matches!(
        outcome.client,
        Err(TlsError::UnrecognizedIssuerError(_))
    ));
    // The server sees the client's fatal alert, unknown_ca is code 48.
    assert!(matches!(outcome.server, Err(TlsError::PeerAlertError(48))));
}

#[test]
fn hostname_mismatch_aborts() {
    let (trust, config) = test_setup();
    let client_cache = SessionCache::new();
    let server_cache = Arc::new(SessionCache::new());

    let outcome = run_handshake(
        record::TLS_1_0,
        record::TLS_1_0,
        "other.gateway.example",
        &trust,
        &client_cache,
        &server_cache,
        &config,
    );
    assert!(matches!(
        outcome.client,
        Err(TlsError::HostnameMismatchError(_))
    ));
}

#[test]
fn three_level_chain_verifies_in_trust_order() {
    let root_key = keypair(KEY_A_N, KEY_A_D);
    let intermediate_key = keypair(KEY_B_N, KEY_B_D);
    let leaf_key = keypair(KEY_C_N, KEY_C_D);

    let root = CertBuilder {
        subject_cn: "Chain Root",
        issuer_cn: "Chain Root",
        serial: 1,
        subject_modulus: &root_key.modulus,
        basic_constraints: Some(true),
        path_len: Some(1),
        not_after: "400101000000Z",
    }
    .build(&root_key.private);
    let intermediate = CertBuilder {
        subject_cn: "Chain Intermediate",
        issuer_cn: "Chain Root",
        serial: 2,
        subject_modulus: &intermediate_key.modulus,
        basic_constraints: Some(true),
        path_len: Some(0),
        not_after: "400101000000Z",
    }
    .build(&root_key.private);
    let leaf = CertBuilder {
        subject_cn: "chain.leaf.example",
        issuer_cn: "Chain Intermediate",
        serial: 3,
        subject_modulus: &leaf_key.modulus,
        basic_constraints: None,
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&intermediate_key.private);

    let trust = TrustAnchors::new();
    trust.install("chain-root", 0, Certificate::from_der(&root).unwrap());

    let chain = vec![
        Certificate::from_der(&leaf).unwrap(),
        Certificate::from_der(&intermediate).unwrap(),
    ];
    let path = verify::verify_chain(&chain, 1_787_749_462, None, None, &trust).unwrap();
    assert_eq!(
        path.subjects,
        vec![
            "CN=Chain Root".to_string(),
            "CN=Chain Intermediate".to_string(),
            "CN=chain.leaf.example".to_string(),
        ]
    );
}

#[test]
fn exhausted_path_length_is_rejected() {
    let root_key = keypair(KEY_A_N, KEY_A_D);
    let int_a_key = keypair(KEY_B_N, KEY_B_D);
    let int_b_key = keypair(KEY_C_N, KEY_C_D);

    // int_b carries pathLen 0 yet signs int_a, which in turn signs the
    // leaf, so the chain is one CA too deep at the leaf's link.
    let int_b = CertBuilder {
        subject_cn: "Deep Int B",
        issuer_cn: "Deep Root",
        serial: 2,
        subject_modulus: &int_b_key.modulus,
        basic_constraints: Some(true),
        path_len: Some(0),
        not_after: "400101000000Z",
    }
    .build(&root_key.private);
    let int_a = CertBuilder {
        subject_cn: "Deep Int A",
        issuer_cn: "Deep Int B",
        serial: 3,
        subject_modulus: &int_a_key.modulus,
        basic_constraints: Some(true),
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&int_b_key.private);
    let leaf = CertBuilder {
        subject_cn: "deep.leaf.example",
        issuer_cn: "Deep Int A",
        serial: 4,
        subject_modulus: &keypair(KEY_C_N, KEY_C_D).modulus,
        basic_constraints: None,
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&int_a_key.private);

    let trust = TrustAnchors::new();
    let chain = vec![
        Certificate::from_der(&leaf).unwrap(),
        Certificate::from_der(&int_a).unwrap(),
        Certificate::from_der(&int_b).unwrap(),
    ];
    assert!(matches!(
        verify::verify_chain(&chain, 1_787_749_462, None, None, &trust),
        Err(TlsError::CertificateChainTooLongError)
    ));
}

#[test]
fn tampered_chain_signature_is_rejected() {
    let root_key = keypair(KEY_A_N, KEY_A_D);
    let leaf_key = keypair(KEY_B_N, KEY_B_D);
    let root = CertBuilder {
        subject_cn: "Tamper Root",
        issuer_cn: "Tamper Root",
        serial: 1,
        subject_modulus: &root_key.modulus,
        basic_constraints: Some(true),
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&root_key.private);
    let leaf = CertBuilder {
        subject_cn: "tamper.leaf.example",
        issuer_cn: "Tamper Root",
        serial: 2,
        subject_modulus: &leaf_key.modulus,
        basic_constraints: None,
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&root_key.private);

    let trust = TrustAnchors::new();
    trust.install("tamper-root", 0, Certificate::from_der(&root).unwrap());

    let mut cert = Certificate::from_der(&leaf).unwrap();
    cert.signature[7] ^= 0x10;
    assert!(matches!(
        verify::verify_chain(&[cert], 1_787_749_462, None, None, &trust),
        Err(TlsError::VerificationFailedError)
    ));
}

#[test]
fn failed_resumption_drops_server_session() {
    let (trust, config) = test_setup();
    let client_cache = SessionCache::new();
    let server_cache = Arc::new(SessionCache::new());

    let first = run_handshake(
        record::TLS_1_0,
        record::TLS_1_0,
        "test.gateway.example",
        &trust,
        &client_cache,
        &server_cache,
        &config,
    );
    let session_id = first.client.unwrap().session_id;
    assert!(server_cache.get_by_id(&session_id).is_some());

    // Corrupt the client's cached master secret so the resumed Finished
    // exchange cannot verify.
    client_cache.add(Session::new(
        "test.gateway.example",
        4433,
        session_id.clone(),
        &[0; 48],
        None,
    ));

    let second = run_handshake(
        record::TLS_1_0,
        record::TLS_1_0,
        "test.gateway.example",
        &trust,
        &client_cache,
        &server_cache,
        &config,
    );
    assert!(matches!(
        second.client,
        Err(TlsError::VerificationFailedError)
    ));
    assert!(matches!(second.server, Err(TlsError::PeerAlertError(42))));
    // The server must not offer the poisoned session again.
    assert!(server_cache.get_by_id(&session_id).is_none());
}

#[test]
fn server_cache_holds_several_sessions() {
    let (trust, config) = test_setup();
    let server_cache = Arc::new(SessionCache::new());

    let first_cache = SessionCache::new();
    let first = run_handshake(
        record::TLS_1_0,
        record::TLS_1_0,
        "test.gateway.example",
        &trust,
        &first_cache,
        &server_cache,
        &config,
    );
    let second_cache = SessionCache::new();
    let second = run_handshake(
        record::TLS_1_0,
        record::TLS_1_0,
        "test.gateway.example",
        &trust,
        &second_cache,
        &server_cache,
        &config,
    );

    // Two distinct clients, two live server-side entries.
    let first_id = first.client.unwrap().session_id;
    let second_id = second.client.unwrap().session_id;
    assert_ne!(first_id, second_id);
    assert!(server_cache.get_by_id(&first_id).is_some());
    assert!(server_cache.get_by_id(&second_id).is_some());
}

#[test]
fn hello_request_is_ignored_mid_handshake() {
    let (root, leaf, _) = server_credentials();
    let trust = TrustAnchors::new();
    trust.install("test-root", 0, Certificate::from_der(&root).unwrap());
    let (mut client_end, mut server_end) = loopback::pair(record::TLS_1_0);

    // Scripted peer that slips a HelloRequest between each real flight.
    let peer = thread::spawn(move || {
        server_end.read_record(ContentType::Handshake).unwrap(); // ClientHello

        let mut hello = vec![3, 1];
        hello.extend_from_slice(&[7; 32]);
        hello.push(32);
        hello.extend_from_slice(&[5; 32]);
        hello.extend_from_slice(&[0x00, 0x05]);
        hello.push(0);
        server_end
            .write_record(ContentType::Handshake, &frame_message(2, &hello))
            .unwrap();

        server_end
            .write_record(ContentType::Handshake, &frame_message(0, &[]))
            .unwrap();
        server_end
            .write_record(
                ContentType::Handshake,
                &frame_message(11, &certificate_message(&[&leaf, &root])),
            )
            .unwrap();
        server_end
            .write_record(ContentType::Handshake, &frame_message(0, &[]))
            .unwrap();
        server_end
            .write_record(ContentType::Handshake, &frame_message(14, &[]))
            .unwrap();

        server_end.read_record(ContentType::Handshake).unwrap(); // ClientKeyExchange
        server_end.read_record(ContentType::ChangeCipherSpec).unwrap();
        server_end
            .write_record(ContentType::ChangeCipherSpec, &[1])
            .unwrap();
        server_end
            .write_record(ContentType::Handshake, &frame_message(0, &[]))
            .unwrap();
        server_end.read_record(ContentType::Handshake).unwrap(); // Finished
    });

    let rand = SystemRandom::new();
    let cache = SessionCache::new();
    let result = Client::new(
        &mut client_end,
        &trust,
        &cache,
        &rand,
        "test.gateway.example",
        4433,
        record::TLS_1_0,
    )
    .handshake();
    peer.join().unwrap();

    // Every HelloRequest was skipped; the attempt died only because the
    // peer hung up before sending its Finished.
    assert!(matches!(result, Err(TlsError::TransportClosedError)));
}

#[test]
fn expired_root_is_distinct_from_expired_leaf() {
    let root_key = keypair(KEY_A_N, KEY_A_D);
    let leaf_key = keypair(KEY_B_N, KEY_B_D);
    let root = CertBuilder {
        subject_cn: "Old Root",
        issuer_cn: "Old Root",
        serial: 1,
        subject_modulus: &root_key.modulus,
        basic_constraints: Some(true),
        path_len: None,
        not_after: "210101000000Z",
    }
    .build(&root_key.private);
    let leaf = CertBuilder {
        subject_cn: "old.leaf.example",
        issuer_cn: "Old Root",
        serial: 2,
        subject_modulus: &leaf_key.modulus,
        basic_constraints: None,
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&root_key.private);

    let trust = TrustAnchors::new();
    trust.install("old-root", 0, Certificate::from_der(&root).unwrap());

    let chain = vec![Certificate::from_der(&leaf).unwrap()];
    assert!(matches!(
        verify::verify_chain(&chain, 1_787_749_462, None, None, &trust),
        Err(TlsError::RootCaExpiredError)
    ));
}

#[test]
fn non_ca_intermediate_is_rejected() {
    let root_key = keypair(KEY_A_N, KEY_A_D);
    let mid_key = keypair(KEY_B_N, KEY_B_D);
    let leaf_key = keypair(KEY_C_N, KEY_C_D);

    // The middle certificate carries basicConstraints with CA absent, so it
    // may not vouch for the leaf.
    let mid = CertBuilder {
        subject_cn: "Plain Mid",
        issuer_cn: "Plain Root",
        serial: 2,
        subject_modulus: &mid_key.modulus,
        basic_constraints: Some(false),
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&root_key.private);
    let leaf = CertBuilder {
        subject_cn: "plain.leaf.example",
        issuer_cn: "Plain Mid",
        serial: 3,
        subject_modulus: &leaf_key.modulus,
        basic_constraints: None,
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&mid_key.private);

    let trust = TrustAnchors::new();
    let chain = vec![
        Certificate::from_der(&leaf).unwrap(),
        Certificate::from_der(&mid).unwrap(),
    ];
    assert!(matches!(
        verify::verify_chain(&chain, 1_787_749_462, None, None, &trust),
        Err(TlsError::UnauthorizedIntermediateCaError(_))
    ));
}

#[test]
fn mismatched_issuer_subject_breaks_the_chain() {
    let root_key = keypair(KEY_A_N, KEY_A_D);
    let other_key = keypair(KEY_B_N, KEY_B_D);
    let leaf_key = keypair(KEY_C_N, KEY_C_D);

    let other = CertBuilder {
        subject_cn: "Unrelated CA",
        issuer_cn: "Unrelated CA",
        serial: 2,
        subject_modulus: &other_key.modulus,
        basic_constraints: Some(true),
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&other_key.private);
    let leaf = CertBuilder {
        subject_cn: "stray.leaf.example",
        issuer_cn: "Stray Root",
        serial: 3,
        subject_modulus: &leaf_key.modulus,
        basic_constraints: None,
        path_len: None,
        not_after: "400101000000Z",
    }
    .build(&root_key.private);

    let trust = TrustAnchors::new();
    let chain = vec![
        Certificate::from_der(&leaf).unwrap(),
        Certificate::from_der(&other).unwrap(),
    ];
    assert!(matches!(
        verify::verify_chain(&chain, 1_787_749_462, None, None, &trust),
        Err(TlsError::BrokenChainLinkError(_))
    ));
}

#[test]
fn suite_parameters_drive_key_block_size() {
    let parameters = cipher::parameters(cipher::TLS_RSA_WITH_RC4_128_MD5).unwrap();
    assert_eq!(parameters.key_block_length(), 64);
    assert_eq!(
        cipher::parameters(fields::Uint16(0x0004)).unwrap().key_block_length(),
        parameters.key_block_length()
    );
}

#[test]
fn built_certificates_parse_cleanly() {
    let (root, leaf, _) = server_credentials();
    let root = Certificate::from_der(&root).unwrap();
    assert!(root.is_ca);
    assert_eq!(root.path_len_constraint, Some(1));
    assert_eq!(root.key_usage, -1);

    let leaf = Certificate::from_der(&leaf).unwrap();
    assert!(!leaf.has_basic_constraints);
    assert!(leaf.host_matches("test.gateway.example"));
    assert_eq!(leaf.signature_algorithm, x509::SignatureAlgorithm::Sha1WithRsa);
}
