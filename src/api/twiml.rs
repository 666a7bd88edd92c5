//! `TwiML` messaging responses

use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use quick_xml::escape::escape;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// A `<Response>` with one `<Message>` per reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwiML(String);

impl TwiML {
    pub fn messages<S: AsRef<str>>(replies: &[S]) -> Self {
        let mut xml = String::from(XML_DECLARATION);
        xml.push_str("<Response>");
        for reply in replies {
            xml.push_str("<Message>");
            xml.push_str(&escape(reply.as_ref()));
            xml.push_str("</Message>");
        }
        xml.push_str("</Response>");
        Self(xml)
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl IntoResponse for TwiML {
    fn into_response(self) -> Response {
        ([(CONTENT_TYPE, "application/xml")], self.0).into_response()
    }
}
