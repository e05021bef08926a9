use crate::config::AppConfig;
use crate::didl::xml_escape;

pub const CONTENT_DIRECTORY_TYPE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";
pub const CONNECTION_MANAGER_TYPE: &str = "urn:schemas-upnp-org:service:ConnectionManager:1";
pub const REGISTRAR_TYPE: &str = "urn:microsoft.com:service:X_MS_MediaReceiverRegistrar:1";

pub fn generate_description_xml(config: &AppConfig) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<root xmlns="urn:schemas-upnp-org:device-1-0" xmlns:dlna="urn:schemas-dlna-org:device-1-0">
    <specVersion><major>1</major><minor>0</minor></specVersion>
    <device>
        <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
        <friendlyName>{name}</friendlyName>
        <manufacturer>OpenCDS</manufacturer>
        <manufacturerURL>https://github.com/opencds/opencds</manufacturerURL>
        <modelDescription>Filesystem media server</modelDescription>
        <modelName>OpenCDS Media Server</modelName>
        <modelNumber>{version}</modelNumber>
        <UDN>uuid:{uuid}</UDN>
        <dlna:X_DLNADOC>DMS-1.50</dlna:X_DLNADOC>
        <serviceList>
            <service>
                <serviceType>{cds}</serviceType>
                <serviceId>urn:upnp-org:serviceId:ContentDirectory</serviceId>
                <SCPDURL>/ContentDirectory.xml</SCPDURL>
                <controlURL>/control/ContentDirectory</controlURL>
                <eventSubURL>/event/ContentDirectory</eventSubURL>
            </service>
            <service>
                <serviceType>{cm}</serviceType>
                <serviceId>urn:upnp-org:serviceId:ConnectionManager</serviceId>
                <SCPDURL>/ConnectionManager.xml</SCPDURL>
                <controlURL>/control/ConnectionManager</controlURL>
                <eventSubURL>/event/ConnectionManager</eventSubURL>
            </service>
            <service>
                <serviceType>{registrar}</serviceType>
                <serviceId>urn:microsoft.com:serviceId:X_MS_MediaReceiverRegistrar</serviceId>
                <SCPDURL>/X_MS_MediaReceiverRegistrar.xml</SCPDURL>
                <controlURL>/control/X_MS_MediaReceiverRegistrar</controlURL>
                <eventSubURL>/event/X_MS_MediaReceiverRegistrar</eventSubURL>
            </service>
        </serviceList>
    </device>
</root>"#,
        name = xml_escape(&config.server.name),
        version = env!("CARGO_PKG_VERSION"),
        uuid = config.server.uuid,
        cds = CONTENT_DIRECTORY_TYPE,
        cm = CONNECTION_MANAGER_TYPE,
        registrar = REGISTRAR_TYPE,
    )
}

/// (argument name, direction, related state variable)
type Argument = (&'static str, &'static str, &'static str);

/// (state variable, data type, sends events)
type StateVariable = (&'static str, &'static str, bool);

fn generate_scpd(actions: &[(&str, &[Argument])], variables: &[StateVariable]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<scpd xmlns="urn:schemas-upnp-org:service-1-0">
    <specVersion><major>1</major><minor>0</minor></specVersion>
    <actionList>"#,
    );
    for (name, arguments) in actions {
        xml.push_str(&format!("\n        <action>\n            <name>{}</name>\n            <argumentList>", name));
        for (arg, direction, variable) in arguments.iter() {
            xml.push_str(&format!(
                "\n                <argument><name>{}</name><direction>{}</direction><relatedStateVariable>{}</relatedStateVariable></argument>",
                arg, direction, variable
            ));
        }
        xml.push_str("\n            </argumentList>\n        </action>");
    }
    xml.push_str("\n    </actionList>\n    <serviceStateTable>");
    for (name, data_type, events) in variables {
        xml.push_str(&format!(
            "\n        <stateVariable sendEvents=\"{}\"><name>{}</name><dataType>{}</dataType></stateVariable>",
            if *events { "yes" } else { "no" },
            name,
            data_type
        ));
    }
    xml.push_str("\n    </serviceStateTable>\n</scpd>");
    xml
}

pub fn generate_content_directory_scpd() -> String {
    let browse: &[Argument] = &[
        ("ObjectID", "in", "A_ARG_TYPE_ObjectID"),
        ("BrowseFlag", "in", "A_ARG_TYPE_BrowseFlag"),
        ("Filter", "in", "A_ARG_TYPE_Filter"),
        ("StartingIndex", "in", "A_ARG_TYPE_Index"),
        ("RequestedCount", "in", "A_ARG_TYPE_Count"),
        ("SortCriteria", "in", "A_ARG_TYPE_SortCriteria"),
        ("Result", "out", "A_ARG_TYPE_Result"),
        ("NumberReturned", "out", "A_ARG_TYPE_Count"),
        ("TotalMatches", "out", "A_ARG_TYPE_Count"),
        ("UpdateID", "out", "A_ARG_TYPE_UpdateID"),
    ];
    let search: &[Argument] = &[
        ("ContainerID", "in", "A_ARG_TYPE_ObjectID"),
        ("SearchCriteria", "in", "A_ARG_TYPE_SearchCriteria"),
        ("Filter", "in", "A_ARG_TYPE_Filter"),
        ("StartingIndex", "in", "A_ARG_TYPE_Index"),
        ("RequestedCount", "in", "A_ARG_TYPE_Count"),
        ("SortCriteria", "in", "A_ARG_TYPE_SortCriteria"),
        ("Result", "out", "A_ARG_TYPE_Result"),
        ("NumberReturned", "out", "A_ARG_TYPE_Count"),
        ("TotalMatches", "out", "A_ARG_TYPE_Count"),
        ("UpdateID", "out", "A_ARG_TYPE_UpdateID"),
    ];

    generate_scpd(
        &[
            ("Browse", browse),
            ("Search", search),
            ("GetSearchCapabilities", &[("SearchCaps", "out", "SearchCapabilities")]),
            ("GetSortCapabilities", &[("SortCaps", "out", "SortCapabilities")]),
            ("GetSystemUpdateID", &[("Id", "out", "SystemUpdateID")]),
        ],
        &[
            ("A_ARG_TYPE_ObjectID", "string", false),
            ("A_ARG_TYPE_BrowseFlag", "string", false),
            ("A_ARG_TYPE_Filter", "string", false),
            ("A_ARG_TYPE_Index", "ui4", false),
            ("A_ARG_TYPE_Count", "ui4", false),
            ("A_ARG_TYPE_SortCriteria", "string", false),
            ("A_ARG_TYPE_SearchCriteria", "string", false),
            ("A_ARG_TYPE_Result", "string", false),
            ("A_ARG_TYPE_UpdateID", "ui4", false),
            ("SearchCapabilities", "string", false),
            ("SortCapabilities", "string", false),
            ("SystemUpdateID", "ui4", true),
        ],
    )
}

pub fn generate_connection_manager_scpd() -> String {
    generate_scpd(
        &[
            (
                "GetProtocolInfo",
                &[
                    ("Source", "out", "SourceProtocolInfo"),
                    ("Sink", "out", "SinkProtocolInfo"),
                ],
            ),
            (
                "GetCurrentConnectionIDs",
                &[("ConnectionIDs", "out", "CurrentConnectionIDs")],
            ),
            (
                "GetCurrentConnectionInfo",
                &[
                    ("ConnectionID", "in", "A_ARG_TYPE_ConnectionID"),
                    ("RcsID", "out", "A_ARG_TYPE_RcsID"),
                    ("AVTransportID", "out", "A_ARG_TYPE_AVTransportID"),
                    ("ProtocolInfo", "out", "A_ARG_TYPE_ProtocolInfo"),
                    ("PeerConnectionManager", "out", "A_ARG_TYPE_ConnectionManager"),
                    ("PeerConnectionID", "out", "A_ARG_TYPE_ConnectionID"),
                    ("Direction", "out", "A_ARG_TYPE_Direction"),
                    ("Status", "out", "A_ARG_TYPE_ConnectionStatus"),
                ],
            ),
        ],
        &[
            ("SourceProtocolInfo", "string", true),
            ("SinkProtocolInfo", "string", true),
            ("CurrentConnectionIDs", "string", true),
            ("A_ARG_TYPE_ConnectionStatus", "string", false),
            ("A_ARG_TYPE_ConnectionManager", "string", false),
            ("A_ARG_TYPE_Direction", "string", false),
            ("A_ARG_TYPE_ProtocolInfo", "string", false),
            ("A_ARG_TYPE_ConnectionID", "i4", false),
            ("A_ARG_TYPE_AVTransportID", "i4", false),
            ("A_ARG_TYPE_RcsID", "i4", false),
        ],
    )
}

pub fn generate_registrar_scpd() -> String {
    generate_scpd(
        &[
            (
                "IsAuthorized",
                &[
                    ("DeviceID", "in", "A_ARG_TYPE_DeviceID"),
                    ("Result", "out", "A_ARG_TYPE_Result"),
                ],
            ),
            (
                "IsValidated",
                &[
                    ("DeviceID", "in", "A_ARG_TYPE_DeviceID"),
                    ("Result", "out", "A_ARG_TYPE_Result"),
                ],
            ),
            (
                "RegisterDevice",
                &[
                    ("RegistrationReqMsg", "in", "A_ARG_TYPE_RegistrationReqMsg"),
                    ("RegistrationRespMsg", "out", "A_ARG_TYPE_RegistrationRespMsg"),
                ],
            ),
        ],
        &[
            ("A_ARG_TYPE_DeviceID", "string", false),
            ("A_ARG_TYPE_Result", "int", false),
            ("A_ARG_TYPE_RegistrationReqMsg", "bin.base64", false),
            ("A_ARG_TYPE_RegistrationRespMsg", "bin.base64", false),
            ("AuthorizationGrantedUpdateID", "ui4", true),
            ("AuthorizationDeniedUpdateID", "ui4", true),
            ("ValidationSucceededUpdateID", "ui4", true),
            ("ValidationRevokedUpdateID", "ui4", true),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_lists_services() {
        let mut config = AppConfig::default();
        config.server.name = "Den & Office".to_string();
        let xml = generate_description_xml(&config);
        assert!(xml.contains("<friendlyName>Den &amp; Office</friendlyName>"));
        assert!(xml.contains(&format!("<UDN>uuid:{}</UDN>", config.server.uuid)));
        assert!(xml.contains(CONTENT_DIRECTORY_TYPE));
        assert!(xml.contains(CONNECTION_MANAGER_TYPE));
        assert!(xml.contains(REGISTRAR_TYPE));
    }

    #[test]
    fn test_scpds_are_well_formed() {
        for xml in [
            generate_content_directory_scpd(),
            generate_connection_manager_scpd(),
            generate_registrar_scpd(),
        ] {
            let events: Result<Vec<_>, _> =
                ::xml::reader::EventReader::new(xml.as_bytes()).into_iter().collect();
            assert!(events.is_ok(), "{}", xml);
        }
        assert!(generate_content_directory_scpd().contains("<name>Search</name>"));
    }
}
