#![allow(dead_code)]

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

pub mod fixtures {
    use mockzure::config::{ConfigFormat, MockConfig};
    use mockzure::dispatcher::HeaderVec;
    use mockzure::server::ParsedRequest;
    use mockzure::spec::DirectorySpecSource;
    use mockzure::MockContext;
    use std::path::PathBuf;
    use std::sync::Arc;

    pub const SANDMAN_ID: &str = "sandman-app-id-12345";
    pub const SANDMAN_SECRET: &str = "sandman-secret-key-development-only";
    pub const ALICE_APP_ID: &str = "alice-app-id";
    pub const SUB: &str = "00000000-0000-0000-0000-000000000000";

    pub fn repo_path(rel: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
    }

    /// Context over the shipped `specs/` and `config.yaml`.
    pub fn shipped_context() -> Arc<MockContext> {
        let specs = DirectorySpecSource::new(repo_path("specs")).load().unwrap();
        let config = MockConfig::load(&repo_path("config.yaml")).unwrap();
        Arc::new(MockContext::build(config, specs.documents))
    }

    /// Context over the shipped `specs/` and an inline YAML data file.
    pub fn yaml_context(data: &str) -> Arc<MockContext> {
        let specs = DirectorySpecSource::new(repo_path("specs")).load().unwrap();
        let config = MockConfig::parse(data, ConfigFormat::Yaml).unwrap();
        Arc::new(MockContext::build(config, specs.documents))
    }

    /// A full-access account whose data-file entry has no secret.
    pub const SECRETLESS_ACCOUNT: &str = r#"
serviceAccounts:
  - applicationId: nosecret
    displayName: Forgot the secret
    permissions:
      - resourceGroup: "*"
        permissions: ["*"]
"#;

    pub fn request(method: &str, target: &str, headers: &[(&str, &str)], body: &str) -> ParsedRequest {
        let headers: HeaderVec = headers
            .iter()
            .map(|(k, v)| (Arc::from(k.to_ascii_lowercase().as_str()), (*v).to_string()))
            .collect();
        ParsedRequest::from_parts(method, target, headers, body.to_string()).unwrap()
    }

    pub fn get(target: &str) -> ParsedRequest {
        request("GET", target, &[("host", "localhost:8090")], "")
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Status, headers (lowercased names) and body.
    pub fn parse_response(resp: &str) -> (u16, Vec<(String, String)>, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut status = 0;
        let mut headers = Vec::new();
        for line in head.lines() {
            if line.starts_with("HTTP/1.1") {
                status = line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("0")
                    .parse()
                    .unwrap();
            } else if let Some((name, val)) = line.split_once(':') {
                headers.push((name.trim().to_ascii_lowercase(), val.trim().to_string()));
            }
        }
        (status, headers, body.to_string())
    }

    pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
