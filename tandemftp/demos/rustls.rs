//! To run this example enable the rustls feature (--features rustls).
//! If you use this code in your own project you need to enable tandemftp's
//! rustls feature through Cargo.toml and also include the webpki-roots crate
//! as a dependency (this includes Mozilla's root certificates for use with
//! rustls).

use std::sync::Arc;
use tandemftp::rustls;
use tandemftp::rustls::ClientConfig;
use tandemftp::{CancelToken, RustlsConnector, RustlsFtpSession, SessionConfig};

fn main() {
    let root_store = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    // Create a secure connection to an FTP server and authenticate to it.
    let token = CancelToken::new();
    let config = SessionConfig::default()
        .with_tls(RustlsConnector::from(Arc::new(config)), "test.rebex.net");
    let mut session = RustlsFtpSession::connect("test.rebex.net:21", config, &token).unwrap();
    session.login(&token, "demo", "password").unwrap();
    for entry in session.list(&token, None).unwrap() {
        println!("{}", entry.name());
    }

    // Terminate the connection to the server.
    let _ = session.quit(&token);
}
