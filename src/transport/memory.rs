//! In-memory transport.

use super::{ResponseState, SourceLocation, Transport};

/// Records headers and notices in memory.
///
/// Headers keep the position of their first write; a rewrite replaces the
/// value in place. Header names compare case-insensitively.
///
/// # Example
///
/// ```
/// use wildfire_client::transport::{MemoryTransport, Transport};
///
/// let mut transport = MemoryTransport::new();
/// transport.set_header("X-Wf-1-Index", "1");
/// transport.set_header("X-Wf-1-Index", "2");
///
/// assert_eq!(transport.header("x-wf-1-index"), Some("2"));
/// assert_eq!(transport.headers().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    headers: Vec<(String, String)>,
    notices: Vec<String>,
    state: ResponseState,
    request_headers: Vec<(String, String)>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header to the simulated request.
    pub fn with_request_header(mut self, name: &str, value: &str) -> Self {
        self.set_request_header(name, value);
        self
    }

    pub fn set_request_header(&mut self, name: &str, value: &str) {
        match self
            .request_headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self
                .request_headers
                .push((name.to_string(), value.to_string())),
        }
    }

    /// Mark the response body as started.
    pub fn start(&mut self, location: Option<SourceLocation>) {
        self.state = ResponseState::Started { location };
    }

    /// All headers in first-write order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Headers whose name starts with `prefix`, in order.
    pub fn headers_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.starts_with(prefix))
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Notices written into the body.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Drop all recorded headers and notices and reopen the response.
    pub fn clear(&mut self) {
        self.headers.clear();
        self.notices.clear();
        self.state = ResponseState::Pending;
    }
}

impl Transport for MemoryTransport {
    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn response_state(&self) -> ResponseState {
        self.state.clone()
    }

    fn write_notice(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }

    fn request_header(&self, name: &str) -> Option<String> {
        self.request_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_order() {
        let mut t = MemoryTransport::new();
        t.set_header("A", "1");
        t.set_header("B", "2");
        t.set_header("A", "3");

        assert_eq!(
            t.headers(),
            &[
                ("A".to_string(), "3".to_string()),
                ("B".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_prefix_filter() {
        let mut t = MemoryTransport::new();
        t.set_header("X-Wf-1-1-1-1", "a");
        t.set_header("X-Wf-1-Index", "1");
        t.set_header("X-Wf-1-1-1-2", "b");

        let found: Vec<_> = t.headers_with_prefix("X-Wf-1-1-1-").collect();
        assert_eq!(found, vec![("X-Wf-1-1-1-1", "a"), ("X-Wf-1-1-1-2", "b")]);
    }

    #[test]
    fn test_state_and_notices() {
        let mut t = MemoryTransport::new();
        assert_eq!(t.response_state(), ResponseState::Pending);

        t.start(Some(SourceLocation {
            file: "index.php".into(),
            line: 3,
        }));
        assert!(t.response_state().is_started());

        t.write_notice("hello");
        assert_eq!(t.notices(), &["hello".to_string()]);

        t.clear();
        assert!(!t.response_state().is_started());
        assert!(t.notices().is_empty());
    }

    #[test]
    fn test_request_headers() {
        let mut t = MemoryTransport::new().with_request_header("User-Agent", "a");
        t.set_request_header("user-agent", "b");
        assert_eq!(t.request_header("USER-AGENT"), Some("b".to_string()));
        assert_eq!(t.request_header("Accept"), None);

        let r = &mut t;
        assert_eq!(Transport::request_header(&r, "User-Agent"), Some("b".to_string()));
    }

    #[test]
    fn test_mut_ref_is_transport() {
        fn set(mut transport: impl Transport) {
            transport.set_header("K", "V");
        }
        let mut t = MemoryTransport::new();
        set(&mut t);
        assert_eq!(t.header("K"), Some("V"));
    }
}
