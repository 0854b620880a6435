//! Login-cookie descriptor (`seraph-config.xml`).

use crate::artifact::{Artifact, Element};
use crate::env::EnvironmentView;
use crate::fields::{ArtifactField, Trace};
use crate::version::VersionToken;

pub const AUTOLOGIN_COOKIE_AGE: ArtifactField =
    ArtifactField::new("autologin.cookie.age", &["ATL_AUTOLOGIN_COOKIE_AGE"], "");

const FIXED_PARAMS: &[(&str, &str)] = &[
    (
        "login.url",
        "/login.action?os_destination=${originalurl}&permissionViolation=true",
    ),
    ("link.login.url", "/login.action"),
    ("cookie.encoding", "cNf"),
    ("login.cookie.key", "seraph.confluence"),
];

const TRAILING_PARAMS: &[(&str, &str)] = &[
    ("login.submit.url", "/dologin.action"),
    ("login.forward.path", "/login.action"),
    ("invalidate.session.on.login", "true"),
];

fn init_param(name: &str, value: &str) -> Element {
    Element::new("init-param")
        .child(Element::new("param-name").text(name))
        .child(Element::new("param-value").text(value))
}

pub(crate) fn build(
    env: &EnvironmentView,
    version: Option<VersionToken>,
    trace: &mut Trace,
) -> Artifact {
    let mut params: Vec<Element> = FIXED_PARAMS
        .iter()
        .map(|(name, value)| init_param(name, value))
        .collect();

    if env.contains(AUTOLOGIN_COOKIE_AGE.sources[0]) {
        let age = trace.take(&AUTOLOGIN_COOKIE_AGE, env, version);
        params.push(init_param(AUTOLOGIN_COOKIE_AGE.name, &age));
    }

    params.extend(
        TRAILING_PARAMS
            .iter()
            .map(|(name, value)| init_param(name, value)),
    );

    let root = Element::new("security-config")
        .child(Element::new("parameters").children(params))
        .child(
            Element::new("rolemapper")
                .attr("class", "com.atlassian.confluence.security.ConfluenceRoleMapper"),
        )
        .child(Element::new("controller").attr(
            "class",
            "com.atlassian.confluence.setup.seraph.ConfluenceSecurityController",
        ))
        .child(
            Element::new("services").child(
                Element::new("service")
                    .attr("class", "com.atlassian.seraph.service.PathService")
                    .child(init_param("config.file", "seraph-paths.xml")),
            ),
        )
        .child(Element::new("elevatedsecurityguard").attr(
            "class",
            "com.atlassian.confluence.security.seraph.ConfluenceElevatedSecurityGuard",
        ))
        .child(
            Element::new("authenticator")
                .attr("class", "com.atlassian.confluence.user.ConfluenceAuthenticator"),
        );

    Artifact::xml(root)
}
