use std::fmt;

use fnv::FnvHashMap;
use serde_json::Value;

use crate::infrastructure::server_impl::server::Method;

#[derive(Debug)]
pub struct Request<'a> {
    pub method: Method,
    pub resource: &'a str,
    pub version: &'a str,
    pub headers: FnvHashMap<&'a str, &'a str>,
    pub body: Option<Value>,
}

impl fmt::Display for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "method: {}", self.method)?;
        writeln!(f, "resource: {}", self.resource)?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "headers: {:?}", self.headers)?;
        writeln!(f, "body: {:?}", self.body)
    }
}
