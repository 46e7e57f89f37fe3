use std::fmt::{self, Write};

use bytes::Bytes;
use compact_str::{CompactString, ToCompactString};
use strum::{EnumMessage, EnumString, IntoStaticStr};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::infrastructure::server_impl::server::Header;

#[allow(clippy::upper_case_acronyms, non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IntoStaticStr, EnumString, EnumMessage)]
pub enum StatusCode {
    #[strum(serialize = "200", message = "OK")]
    Ok,
    #[strum(serialize = "404", message = "Not Found")]
    NotFound,
    #[strum(serialize = "405", message = "Not Allowed")]
    NotAllowed,
}

impl StatusCode {
    /// Reason phrase, also reused as the body of error responses.
    pub fn message(self) -> &'static str {
        self.get_message().expect("every variant carries a message")
    }
}

/// Response headers keep insertion order so the wire output is stable.
#[derive(Debug)]
pub struct Response {
    pub version: String,
    pub status_code: StatusCode,
    pub headers: Vec<(Header, CompactString)>,
    pub body: String,
}

impl Response {
    pub fn new(version: &str, status_code: StatusCode, body: String, served_by: &str) -> Self {
        let headers = vec![
            (Header::CONTENT_TYPE, "application/json".to_compact_string()),
            (Header::HOST, served_by.to_compact_string()),
            (Header::DATE, http_date(OffsetDateTime::now_utc())),
            (Header::CONTENT_LENGTH, body.len().to_compact_string()),
        ];

        Self {
            version: version.to_owned(),
            status_code,
            headers,
            body,
        }
    }

    pub fn into_http(self) -> Bytes {
        let mut buf = String::with_capacity(128);
        let code: &str = self.status_code.into();
        let message = self.status_code.message();

        write!(buf, "{} {code} {message}\r\n", self.version).expect("No reason to fail.");
        for (name, value) in &self.headers {
            let name: &str = (*name).into();
            write!(buf, "{name}: {value}\r\n").unwrap();
        }
        write!(buf, "\r\n{}\r\n", self.body).unwrap();

        buf.into()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code: &str = self.status_code.into();
        writeln!(f, "status code: {code}")?;
        writeln!(f, "status msg: {}", self.status_code.message())?;
        writeln!(f, "headers: {:?}", self.headers)?;
        writeln!(f, "body: {}", self.body)
    }
}

/// Formats a date the way asctime does, e.g. `Sun Nov  6 08:49:37 1994`.
fn http_date(moment: OffsetDateTime) -> CompactString {
    let format = format_description!(
        "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
    );
    moment
        .format(&format)
        .expect("No reason to fail.")
        .to_compact_string()
}
