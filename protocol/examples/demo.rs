//! Terminal walkthrough of a full Peerflash login.
//!
//! Plays both sides: the client generates a `did:key` identity and signs a
//! credential over the server's nonce, the server verifies it and issues a
//! session. Ends by showing the replay and tampering cases being refused.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use peerflash_protocol::auth::{
    IdentityRegistry, NonceIssuer, SessionIssuer, SessionValidator, SignatureVerifier,
};
use peerflash_protocol::config::{AuthConfig, SessionSecret};
use peerflash_protocol::credential::CredentialBuilder;
use peerflash_protocol::crypto::IdentityKeypair;
use peerflash_protocol::identity::DidKey;
use peerflash_protocol::storage::AuthDb;

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const MAGENTA: &str = "\x1b[35m";
const WHITE: &str = "\x1b[37m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BOLD}{WHITE}  PEERFLASH  --  DID Challenge-Response Login Demo{RESET}");
    println!("{DIM}  did:key + Ed25519 + HS256 sessions{RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]========================================{RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn refused(text: &str) {
    println!("{RED}  [REFUSED] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.2} ms]{RESET}");
}

fn shorten(s: &str) -> String {
    if s.len() <= 24 {
        return s.to_string();
    }
    format!("{}...{}", &s[..16], &s[s.len() - 6..])
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let demo_start = Instant::now();
    banner();

    let db = AuthDb::open_temporary().expect("temporary database");
    let config = AuthConfig::new(SessionSecret::ephemeral());
    let registry = IdentityRegistry::new(db.clone());
    let nonces = NonceIssuer::new(db.clone(), &config);
    let verifier = SignatureVerifier::new(db.clone(), &config);
    let sessions = SessionIssuer::new(&config);
    let validator = SessionValidator::new(&config);

    section(1, "Client generates a self-certifying identity");
    let t = Instant::now();
    let keypair = IdentityKeypair::generate();
    let did = DidKey::from_public_key(&keypair.public_key());
    timing("keygen", t.elapsed());
    info("DID", &shorten(did.as_str()));
    success("Public key recovered from the DID string alone");

    section(2, "Signup");
    let record = registry
        .register(did.as_str(), "Grace Hopper", "Computer Science")
        .expect("signup");
    info("record id", &record.id.to_string());

    section(3, "Login: server issues a nonce");
    let challenge = nonces.issue(did.as_str()).expect("nonce");
    info("nonce", &shorten(&challenge.value));
    info("expires", &challenge.expires_at.to_rfc3339());

    section(4, "Client signs a credential over the nonce");
    let t = Instant::now();
    let vc = CredentialBuilder::new(&did, &challenge.value)
        .sign(&keypair)
        .expect("sign");
    timing("sign", t.elapsed());
    info("proof", &vc.proof.proof_type);
    info("signature", &shorten(&vc.proof.signature));

    section(5, "Server verifies and issues a session");
    let t = Instant::now();
    let verified = verifier.verify(&vc).expect("verify");
    timing("verify", t.elapsed());
    let session = sessions.issue(&verified).expect("session");
    let who = validator.validate(&session.token).expect("validate");
    success(&format!("Session valid for {}", shorten(who.as_str())));
    info("session expires", &session.claims.expires_at().to_rfc3339());

    section(6, "Attacks");
    match verifier.verify(&vc) {
        Err(e) => refused(&format!("replay of the same credential: {e}")),
        Ok(_) => println!("{RED}  replay unexpectedly accepted{RESET}"),
    }

    let fresh = nonces.issue(did.as_str()).expect("nonce");
    let mut tampered = CredentialBuilder::new(&did, &fresh.value)
        .sign(&keypair)
        .expect("sign");
    tampered.claim.issuance_date = "1970-01-01T00:00:00.000Z".into();
    match verifier.verify(&tampered) {
        Err(e) => refused(&format!("claim edited after signing: {e}")),
        Ok(_) => println!("{RED}  tampered credential unexpectedly accepted{RESET}"),
    }

    println!();
    timing("total", demo_start.elapsed());
    println!();
}
