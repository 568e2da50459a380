//! TwiML rendering for message replies and voice scripts

use axum::http::header;
use axum::response::{IntoResponse, Response};
use roost_engine::{VoiceScript, VoiceStep};

/// An XML body served as `text/xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Twiml(pub String);

impl IntoResponse for Twiml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "text/xml")], self.0).into_response()
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reply to an inbound text; an empty reply sends nothing back
pub fn message(reply: &str) -> Twiml {
    if reply.is_empty() {
        return Twiml("<Response></Response>".to_string());
    }
    Twiml(format!(
        "<Response><Message>{}</Message></Response>",
        escape(reply)
    ))
}

pub fn voice(script: &VoiceScript) -> Twiml {
    let mut xml = String::from("<Response>");
    for step in script.steps() {
        match step {
            VoiceStep::Say(text) => {
                xml.push_str(&format!("<Say>{}</Say>", escape(text)));
            }
            VoiceStep::Gather { action, num_digits } => {
                xml.push_str(&format!(
                    "<Gather action=\"{}\" method=\"POST\" numDigits=\"{}\"/>",
                    escape(action),
                    num_digits
                ));
            }
            VoiceStep::Hangup => xml.push_str("<Hangup/>"),
        }
    }
    xml.push_str("</Response>");
    Twiml(xml)
}
