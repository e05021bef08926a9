//! SOAP envelope parsing and response/fault rendering for UPnP control requests.

use crate::didl::xml_escape;
use crate::error::ActionError;
use std::collections::HashMap;
use tracing::debug;
use xml::reader::{EventReader, XmlEvent};

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// An action invocation extracted from a control request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapAction {
    /// Namespace of the action element, e.g. `urn:schemas-upnp-org:service:ContentDirectory:1`.
    pub service_type: String,
    pub name: String,
    pub args: HashMap<String, String>,
}

impl SoapAction {
    /// Parse the first element inside `s:Body` as the action and its children as arguments.
    pub fn parse(body: &str) -> Result<SoapAction, ActionError> {
        let parser = EventReader::new(body.as_bytes());
        let mut in_body = false;
        let mut action: Option<SoapAction> = None;
        let mut arg: Option<String> = None;
        let mut text = String::new();
        let mut depth_in_action = 0usize;

        for event in parser {
            let event = event.map_err(|e| {
                debug!("Malformed SOAP request: {}", e);
                ActionError::InvalidAction
            })?;
            match event {
                XmlEvent::StartElement { name, .. } => {
                    if !in_body {
                        if name.local_name == "Body"
                            && name.namespace.as_deref().map_or(true, |ns| ns == ENVELOPE_NS)
                        {
                            in_body = true;
                        }
                    } else if action.is_none() {
                        action = Some(SoapAction {
                            service_type: name.namespace.clone().unwrap_or_default(),
                            name: name.local_name.clone(),
                            args: HashMap::new(),
                        });
                        depth_in_action = 0;
                    } else {
                        depth_in_action += 1;
                        if depth_in_action == 1 {
                            arg = Some(name.local_name.clone());
                            text.clear();
                        }
                    }
                }
                XmlEvent::Characters(chars) | XmlEvent::CData(chars) => {
                    if arg.is_some() {
                        text.push_str(&chars);
                    }
                }
                XmlEvent::Whitespace(ws) => {
                    if arg.is_some() {
                        text.push_str(&ws);
                    }
                }
                XmlEvent::EndElement { .. } => {
                    if action.is_none() {
                        continue;
                    }
                    if depth_in_action == 0 {
                        return action.ok_or(ActionError::InvalidAction);
                    }
                    if depth_in_action == 1 {
                        if let (Some(name), Some(current)) = (arg.take(), action.as_mut()) {
                            current.args.insert(name, std::mem::take(&mut text));
                        }
                    }
                    depth_in_action -= 1;
                }
                _ => {}
            }
        }

        Err(ActionError::InvalidAction)
    }

    /// A required argument; missing ones are a 402.
    pub fn arg(&self, name: &str) -> Result<&str, ActionError> {
        self.args
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ActionError::InvalidArgs(format!("missing argument {}", name)))
    }

    /// A required unsigned integer argument.
    pub fn arg_u32(&self, name: &str) -> Result<u32, ActionError> {
        self.arg(name)?
            .trim()
            .parse()
            .map_err(|_| ActionError::InvalidArgs(format!("argument {} is not a ui4", name)))
    }
}

/// Render a successful action response. Argument values are escaped here.
pub fn action_response(service_type: &str, action: &str, args: &[(&str, String)]) -> String {
    let mut body = String::new();
    for (name, value) in args {
        body.push_str(&format!("<{}>{}</{}>", name, xml_escape(value), name));
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <u:{action}Response xmlns:u="{service}">{body}</u:{action}Response>
  </s:Body>
</s:Envelope>"#,
        action = action,
        service = service_type,
        body = body
    )
}

/// Render a UPnP error as a SOAP fault body.
pub fn fault_response(error: &ActionError) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail>
        <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
          <errorCode>{}</errorCode>
          <errorDescription>{}</errorDescription>
        </UPnPError>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#,
        error.code(),
        xml_escape(error.description())
    )
}
