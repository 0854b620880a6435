//! Server descriptor (`conf/server.xml`).

use crate::artifact::{Artifact, Element};
use crate::env::{EnvironmentView, parse_bool};
use crate::fields::{ArtifactField, Trace};
use crate::version::{ACCESS_LOG_AND_HIKARI_SINCE, VersionToken};
use tracing::debug;

pub const MGMT_PORT: ArtifactField =
    ArtifactField::new("Server@port", &["ATL_TOMCAT_MGMT_PORT"], "8000");

/// Connector attributes, in render order.
pub const CONNECTOR_FIELDS: &[ArtifactField] = &[
    ArtifactField::new("port", &["ATL_TOMCAT_PORT"], "8090"),
    ArtifactField::new("maxThreads", &["ATL_TOMCAT_MAXTHREADS"], "48"),
    ArtifactField::new("minSpareThreads", &["ATL_TOMCAT_MINSPARETHREADS"], "10"),
    ArtifactField::new("connectionTimeout", &["ATL_TOMCAT_CONNECTIONTIMEOUT"], "20000"),
    ArtifactField::new("enableLookups", &["ATL_TOMCAT_ENABLELOOKUPS"], "false"),
    ArtifactField::new(
        "protocol",
        &["ATL_TOMCAT_PROTOCOL"],
        "org.apache.coyote.http11.Http11NioProtocol",
    ),
    ArtifactField::new("redirectPort", &["ATL_TOMCAT_REDIRECTPORT"], "8443"),
    ArtifactField::new("acceptCount", &["ATL_TOMCAT_ACCEPTCOUNT"], "10"),
    ArtifactField::new("debug", &["ATL_TOMCAT_DEBUG"], "0"),
    ArtifactField::new("URIEncoding", &["ATL_TOMCAT_URIENCODING"], "UTF-8"),
    ArtifactField::new(
        "secure",
        &["ATL_TOMCAT_SECURE", "CATALINA_CONNECTOR_SECURE"],
        "false",
    ),
    ArtifactField::new(
        "scheme",
        &["ATL_TOMCAT_SCHEME", "CATALINA_CONNECTOR_SCHEME"],
        "http",
    ),
    ArtifactField::new(
        "proxyName",
        &["ATL_PROXY_NAME", "CATALINA_CONNECTOR_PROXYNAME"],
        "",
    ),
    ArtifactField::new(
        "proxyPort",
        &["ATL_PROXY_PORT", "CATALINA_CONNECTOR_PROXYPORT"],
        "",
    ),
    ArtifactField::new("maxHttpHeaderSize", &["ATL_TOMCAT_MAXHTTPHEADERSIZE"], "8192"),
];

pub const CONTEXT_PATH: ArtifactField = ArtifactField::new(
    "Context@path",
    &["ATL_TOMCAT_CONTEXTPATH", "CATALINA_CONTEXT_PATH"],
    "",
);

/// Presence of the access-log valves. Only recognised boolean words count
/// as explicit; anything else falls back to the version default.
pub const ACCESS_LOG: ArtifactField = ArtifactField::gated(
    "accessLog",
    &["ATL_TOMCAT_ACCESS_LOG"],
    "false",
    ACCESS_LOG_AND_HIKARI_SINCE,
    "true",
);

pub const ACCESS_LOG_MAX_DAYS: ArtifactField =
    ArtifactField::new("AccessLogValve@maxDays", &["ATL_TOMCAT_ACCESS_LOGS_MAXDAYS"], "-1");

pub const PROXY_INTERNAL_IPS: ArtifactField = ArtifactField::new(
    "RemoteIpValve@internalProxies",
    &["ATL_TOMCAT_PROXY_INTERNAL_IPS"],
    "",
);

pub const ACCESS_LOG_VALVE_CLASS: &str = "org.apache.catalina.valves.AccessLogValve";
pub const REMOTE_IP_VALVE_CLASS: &str = "org.apache.catalina.valves.RemoteIpValve";

const ACCESS_LOG_PATTERN: &str =
    "%t %{X-AUSERNAME}o %I %h %r %s %Dms %b %{Referer}i %{User-Agent}i";

/// Whether the access-log valves are rendered.
pub fn access_log_enabled(
    env: &EnvironmentView,
    version: Option<VersionToken>,
    trace: &mut Trace,
) -> bool {
    let resolved = ACCESS_LOG.resolve(env, version);
    if let Some(enabled) = parse_bool(&resolved.value) {
        trace.record(ACCESS_LOG.name, resolved.value, resolved.origin);
        return enabled;
    }

    let (fallback, origin) = ACCESS_LOG.default_for(version);
    debug!(value = %resolved.value, fallback, "Unrecognised access log flag, using default");
    trace.record(ACCESS_LOG.name, fallback, origin);
    fallback == "true"
}

pub(crate) fn build(
    env: &EnvironmentView,
    version: Option<VersionToken>,
    trace: &mut Trace,
) -> Artifact {
    let mut connector = Element::new("Connector");
    for field in CONNECTOR_FIELDS {
        let value = trace.take(field, env, version);
        connector = connector.attr(field.name, value);
    }

    let mut context = Element::new("Context")
        .attr("path", trace.take(&CONTEXT_PATH, env, version))
        .attr("docBase", "../confluence")
        .attr("debug", "0")
        .attr("reloadable", "false")
        .attr("useHttpOnly", "true")
        .child(Element::new("Manager").attr("pathname", ""))
        .child(
            Element::new("Valve")
                .attr("className", "org.apache.catalina.valves.StuckThreadDetectionValve")
                .attr("threshold", "60"),
        );

    if access_log_enabled(env, version, trace) {
        context = context
            .child(
                Element::new("Valve")
                    .attr("className", ACCESS_LOG_VALVE_CLASS)
                    .attr("directory", "logs")
                    .attr("maxDays", trace.take(&ACCESS_LOG_MAX_DAYS, env, version))
                    .attr("pattern", ACCESS_LOG_PATTERN)
                    .attr("prefix", "conf_access_log")
                    .attr("requestAttributesEnabled", "true")
                    .attr("rotatable", "true")
                    .attr("suffix", ".log"),
            )
            .child(
                Element::new("Valve")
                    .attr("className", REMOTE_IP_VALVE_CLASS)
                    .attr("internalProxies", trace.take(&PROXY_INTERNAL_IPS, env, version))
                    .attr("proxiesHeader", "x-forwarded-by")
                    .attr("remoteIpHeader", "x-forwarded-for")
                    .attr("protocolHeader", "x-forwarded-proto")
                    .attr("requestAttributesEnabled", "true")
                    .attr("resolveHosts", "false"),
            );
    }

    let synchrony = Element::new("Context")
        .attr("path", "${confluence.context.path}/synchrony-proxy")
        .attr("docBase", "../synchrony-proxy")
        .attr("debug", "0")
        .attr("reloadable", "false")
        .attr("useHttpOnly", "true")
        .child(
            Element::new("Valve")
                .attr("className", "org.apache.catalina.valves.StuckThreadDetectionValve")
                .attr("threshold", "60"),
        );

    let host = Element::new("Host")
        .attr("name", "localhost")
        .attr("debug", "0")
        .attr("appBase", "webapps")
        .attr("unpackWARs", "true")
        .attr("autoDeploy", "false")
        .attr("startStopThreads", "4")
        .child(context)
        .child(synchrony);

    let engine = Element::new("Engine")
        .attr("name", "Standalone")
        .attr("defaultHost", "localhost")
        .attr("debug", "0")
        .child(host);

    let service = Element::new("Service")
        .attr("name", "Tomcat-Standalone")
        .child(connector)
        .child(engine);

    let root = Element::new("Server")
        .attr("port", trace.take(&MGMT_PORT, env, version))
        .attr("shutdown", "SHUTDOWN")
        .attr("debug", "0")
        .child(service);

    Artifact::xml(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valve<'a>(artifact: &'a Artifact, class: &str) -> Option<&'a Element> {
        artifact
            .root()
            .unwrap()
            .find_all("Valve")
            .into_iter()
            .find(|v| v.get_attr("className") == Some(class))
    }

    #[test]
    fn test_mgmt_port_rendered_on_root() {
        let env = EnvironmentView::from_pairs([("ATL_TOMCAT_MGMT_PORT", "8006")]);
        let art = build(&env, None, &mut Trace::new());
        assert_eq!(art.root().unwrap().get_attr("port"), Some("8006"));
    }

    #[test]
    fn test_access_log_unrecognised_value_uses_version_default() {
        let env = EnvironmentView::from_pairs([("ATL_TOMCAT_ACCESS_LOG", "sometimes")]);
        let old = build(&env, Some(VersionToken::new(7, 10, 0)), &mut Trace::new());
        let new = build(&env, Some(VersionToken::new(7, 11, 0)), &mut Trace::new());
        assert!(valve(&old, REMOTE_IP_VALVE_CLASS).is_none());
        assert!(valve(&new, REMOTE_IP_VALVE_CLASS).is_some());
    }

    #[test]
    fn test_access_log_trace_reports_deciding_origin() {
        use crate::fields::Origin;

        let env = EnvironmentView::from_pairs([("ATL_TOMCAT_ACCESS_LOG", "sometimes")]);
        let mut trace = Trace::new();
        assert!(access_log_enabled(&env, Some(VersionToken::new(7, 12, 0)), &mut trace));
        let entry = &trace.entries()[0];
        assert_eq!(entry.value, "true");
        assert_eq!(entry.origin, Origin::GatedDefault);

        let env = EnvironmentView::from_pairs([("ATL_TOMCAT_ACCESS_LOG", "off")]);
        let mut trace = Trace::new();
        assert!(!access_log_enabled(&env, None, &mut trace));
        assert_eq!(
            trace.entries()[0].origin,
            Origin::Env("ATL_TOMCAT_ACCESS_LOG".into())
        );
    }

    #[test]
    fn test_access_log_valve_attributes() {
        let env = EnvironmentView::from_pairs([("ATL_TOMCAT_ACCESS_LOGS_MAXDAYS", "7")]);
        let art = build(&env, None, &mut Trace::new());
        let access = valve(&art, ACCESS_LOG_VALVE_CLASS).unwrap();
        assert_eq!(access.get_attr("maxDays"), Some("7"));
        let remote = valve(&art, REMOTE_IP_VALVE_CLASS).unwrap();
        assert_eq!(remote.get_attr("internalProxies"), Some(""));
    }

    #[test]
    fn test_valves_nested_in_first_context() {
        let art = build(&EnvironmentView::default(), None, &mut Trace::new());
        let context = art.root().unwrap().find("Context").unwrap();
        assert!(context
            .children
            .iter()
            .any(|c| c.get_attr("className") == Some(REMOTE_IP_VALVE_CLASS)));
    }
}
