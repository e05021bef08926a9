use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use opencds::{config::AppConfig, state::AppState, web};
use std::fs;
use std::net::IpAddr;
use tempfile::TempDir;
use tower::ServiceExt;

pub const CDS: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";

fn id3_frame(id: &[u8; 4], text: &str) -> Vec<u8> {
    let mut frame = id.to_vec();
    frame.extend_from_slice(&((text.len() + 1) as u32).to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(text.as_bytes());
    frame
}

/// APIC frame holding a front-cover picture.
fn apic_frame(mime: &str, image: &[u8]) -> Vec<u8> {
    let mut body = vec![0];
    body.extend_from_slice(mime.as_bytes());
    body.extend_from_slice(&[0, 3, 0]);
    body.extend_from_slice(image);

    let mut frame = b"APIC".to_vec();
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend(body);
    frame
}

/// A minimal MP3: an ID3v2.3 tag followed by silent MPEG-1 Layer III frames.
pub fn mp3_with_tags(title: &str, artist: &str) -> Vec<u8> {
    mp3_with_frames(title, artist, Vec::new())
}

/// Like [`mp3_with_tags`], with an embedded cover picture.
pub fn mp3_with_cover(title: &str, artist: &str, mime: &str, image: &[u8]) -> Vec<u8> {
    mp3_with_frames(title, artist, apic_frame(mime, image))
}

fn mp3_with_frames(title: &str, artist: &str, extra: Vec<u8>) -> Vec<u8> {
    let mut frames = id3_frame(b"TIT2", title);
    frames.extend(id3_frame(b"TPE1", artist));
    frames.extend(extra);

    let size = frames.len() as u32;
    let mut data = b"ID3\x03\x00\x00".to_vec();
    data.extend_from_slice(&[
        ((size >> 21) & 0x7f) as u8,
        ((size >> 14) & 0x7f) as u8,
        ((size >> 7) & 0x7f) as u8,
        (size & 0x7f) as u8,
    ]);
    data.extend(frames);

    for _ in 0..10 {
        data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        data.extend(std::iter::repeat(0u8).take(413));
    }
    data
}

/// `a.mp3` (tagged), `b.txt` and an empty `Sub/` directory.
pub fn media_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.mp3"), mp3_with_tags("Tagged Title", "The Band")).unwrap();
    fs::write(temp_dir.path().join("b.txt"), b"plain text").unwrap();
    fs::create_dir(temp_dir.path().join("Sub")).unwrap();
    temp_dir
}

pub fn app_state(temp_dir: &TempDir) -> AppState {
    app_state_with(temp_dir, |_| {})
}

/// State for `temp_dir` after `adjust` has edited the test configuration.
pub fn app_state_with(temp_dir: &TempDir, adjust: impl FnOnce(&mut AppConfig)) -> AppState {
    let mut config = AppConfig::default();
    config.media.root = temp_dir.path().to_string_lossy().to_string();
    config.media.max_returned_items = 0;
    adjust(&mut config);
    let addresses: Vec<IpAddr> = vec!["192.168.1.20".parse().unwrap()];
    AppState::from_config(config, addresses).unwrap()
}

pub fn router(temp_dir: &TempDir) -> Router {
    web::create_router(app_state(temp_dir))
}

pub fn soap_envelope(service: &str, action: &str, args: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in args {
        body.push_str(&format!("<{}>{}</{}>", name, opencds::didl::xml_escape(value), name));
    }
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
<s:Body><u:{action} xmlns:u="{service}">{body}</u:{action}></s:Body>
</s:Envelope>"#
    )
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

pub async fn control(
    router: Router,
    path: &str,
    service: &str,
    action: &str,
    args: &[(&str, &str)],
) -> (StatusCode, String) {
    let request = Request::post(path)
        .header("content-type", "text/xml; charset=\"utf-8\"")
        .header("soapaction", format!("\"{}#{}\"", service, action))
        .header("host", "192.168.1.20:8200")
        .body(Body::from(soap_envelope(service, action, args)))
        .unwrap();
    let (status, _, body) = send(router, request).await;
    (status, String::from_utf8(body).unwrap())
}

/// Unescaped text of the first element named `name` in a SOAP response.
pub fn element_text(xml_body: &str, name: &str) -> Option<String> {
    use xml::reader::{EventReader, XmlEvent};

    let mut inside = false;
    let mut text = String::new();
    for event in EventReader::new(xml_body.as_bytes()) {
        match event.ok()? {
            XmlEvent::StartElement { name: element, .. } if element.local_name == name => {
                inside = true;
            }
            XmlEvent::Characters(chars) if inside => text.push_str(&chars),
            XmlEvent::EndElement { name: element } if element.local_name == name => {
                return Some(text);
            }
            _ => {}
        }
    }
    None
}
