use crate::{
    catalog::{sort::SORT_CAPABILITIES, BrowseFlag, BrowseResult, CatalogBrowser},
    dlna::{mime::source_protocol_info, ClientContext},
    error::{ActionError, AppError},
    state::AppState,
    web::{
        soap::{action_response, fault_response, SoapAction},
        xml::{
            generate_connection_manager_scpd, generate_content_directory_scpd,
            generate_description_xml, generate_registrar_scpd, CONNECTION_MANAGER_TYPE,
            CONTENT_DIRECTORY_TYPE, REGISTRAR_TYPE,
        },
    },
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

const XML_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

/// Output arguments of a successful action, in declaration order.
pub type ActionOutput = Vec<(&'static str, String)>;

pub async fn root_handler() -> &'static str {
    "OpenCDS Media Server"
}

pub async fn description_handler(State(state): State<AppState>) -> impl IntoResponse {
    let xml = generate_description_xml(&state.config);
    (StatusCode::OK, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], xml)
}

pub async fn content_directory_scpd() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        generate_content_directory_scpd(),
    )
}

pub async fn connection_manager_scpd() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        generate_connection_manager_scpd(),
    )
}

pub async fn registrar_scpd() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        generate_registrar_scpd(),
    )
}

pub async fn content_directory_control(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let action = match SoapAction::parse(&body) {
        Ok(action) => action,
        Err(e) => return soap_fault(&e),
    };
    let client = ClientContext::from_headers(&headers);
    let browser = state.browser.clone();
    let name = action.name.clone();

    // Browse and Search walk the filesystem.
    let result = tokio::task::spawn_blocking(move || {
        dispatch_content_directory(&browser, &action, &client)
    })
    .await
    .unwrap_or_else(|e| Err(ActionError::Internal(e.to_string())));

    soap_reply(CONTENT_DIRECTORY_TYPE, &name, result)
}

pub async fn connection_manager_control(body: String) -> Response {
    match SoapAction::parse(&body) {
        Ok(action) => soap_reply(
            CONNECTION_MANAGER_TYPE,
            &action.name,
            dispatch_connection_manager(&action),
        ),
        Err(e) => soap_fault(&e),
    }
}

pub async fn registrar_control(body: String) -> Response {
    match SoapAction::parse(&body) {
        Ok(action) => soap_reply(REGISTRAR_TYPE, &action.name, dispatch_registrar(&action)),
        Err(e) => soap_fault(&e),
    }
}

/// `GET`/`HEAD` on the content and album-art URIs; any other method is refused with a 500.
pub async fn resource_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    state
        .resources
        .handle_file_request(&method, &uri, &headers)
        .await
}

pub fn dispatch_content_directory(
    browser: &CatalogBrowser,
    action: &SoapAction,
    client: &ClientContext,
) -> Result<ActionOutput, ActionError> {
    debug!("ContentDirectory action {}", action.name);
    match action.name.as_str() {
        "Browse" => {
            let flag: BrowseFlag = action.arg("BrowseFlag")?.parse()?;
            let result = browser.browse(
                action.arg("ObjectID")?,
                flag,
                action.arg("Filter")?,
                action.arg_u32("StartingIndex")?,
                action.arg_u32("RequestedCount")?,
                action.args.get("SortCriteria").map(String::as_str).unwrap_or(""),
                client,
            )?;
            Ok(browse_output(result))
        }
        "Search" => {
            let result = browser.search(
                action.arg("ContainerID")?,
                action.arg("SearchCriteria")?,
                action.arg("Filter")?,
                action.arg_u32("StartingIndex")?,
                action.arg_u32("RequestedCount")?,
                action.args.get("SortCriteria").map(String::as_str).unwrap_or(""),
                client,
            )?;
            Ok(browse_output(result))
        }
        "GetSystemUpdateID" => Ok(vec![("Id", browser.system_update_id().to_string())]),
        "GetSortCapabilities" => Ok(vec![("SortCaps", SORT_CAPABILITIES.to_string())]),
        "GetSearchCapabilities" => Ok(vec![("SearchCaps", "upnp:class".to_string())]),
        _ => Err(ActionError::InvalidAction),
    }
}

pub fn dispatch_connection_manager(action: &SoapAction) -> Result<ActionOutput, ActionError> {
    match action.name.as_str() {
        "GetProtocolInfo" => Ok(vec![
            ("Source", source_protocol_info()),
            ("Sink", String::new()),
        ]),
        "GetCurrentConnectionIDs" => Ok(vec![("ConnectionIDs", "0".to_string())]),
        "GetCurrentConnectionInfo" => {
            let id = action.arg("ConnectionID")?.trim();
            if id != "0" {
                return Err(ActionError::InvalidArgs(format!("no connection {}", id)));
            }
            Ok(vec![
                ("RcsID", "-1".to_string()),
                ("AVTransportID", "-1".to_string()),
                ("ProtocolInfo", String::new()),
                ("PeerConnectionManager", String::new()),
                ("PeerConnectionID", "-1".to_string()),
                ("Direction", "Output".to_string()),
                ("Status", "OK".to_string()),
            ])
        }
        _ => Err(ActionError::InvalidAction),
    }
}

/// Windows Media Player asks these before browsing; every device is accepted.
pub fn dispatch_registrar(action: &SoapAction) -> Result<ActionOutput, ActionError> {
    match action.name.as_str() {
        "IsAuthorized" | "IsValidated" => Ok(vec![("Result", "1".to_string())]),
        "RegisterDevice" => Ok(vec![("RegistrationRespMsg", String::new())]),
        _ => Err(ActionError::InvalidAction),
    }
}

fn browse_output(result: BrowseResult) -> ActionOutput {
    vec![
        ("Result", result.didl),
        ("NumberReturned", result.number_returned.to_string()),
        ("TotalMatches", result.total_matches.to_string()),
        ("UpdateID", result.update_id.to_string()),
    ]
}

fn soap_reply(service_type: &str, action: &str, result: Result<ActionOutput, ActionError>) -> Response {
    match result {
        Ok(output) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, XML_CONTENT_TYPE),
                (HeaderName::from_static("ext"), ""),
            ],
            action_response(service_type, action, &output),
        )
            .into_response(),
        Err(e) => {
            warn!("{} failed with {}: {}", action, e.code(), e);
            soap_fault(&e)
        }
    }
}

fn soap_fault(error: &ActionError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        fault_response(error),
    )
        .into_response()
}
