//! Application config (`confluence.cfg.xml`).
//!
//! Optional sections are rules: each one fires on its trigger variable and
//! then either writes its complete field set or fails validation. A section
//! is never written with some of its required fields missing.

use crate::artifact::{Artifact, Element};
use crate::env::EnvironmentView;
use crate::error::{ResolveError, ResolveResult};
use crate::fields::{ArtifactField, Origin, Trace};
use crate::version::{self, ACCESS_LOG_AND_HIKARI_SINCE, VersionToken};
use tracing::warn;

pub const SETUP_STEP: ArtifactField =
    ArtifactField::new("setupStep", &["ATL_SETUP_STEP"], "setupstart");
pub const SETUP_TYPE: ArtifactField = ArtifactField::new("setupType", &["ATL_SETUP_TYPE"], "custom");
pub const BUILD_NUMBER: ArtifactField =
    ArtifactField::new("buildNumber", &["ATL_BUILD_NUMBER"], "0");

pub const LUCENE_INDEX_DIR: ArtifactField = ArtifactField::new(
    "lucene.index.dir",
    &["ATL_LUCENE_INDEX_DIR"],
    "${confluenceHome}/index",
);

pub const JDBC_URL: &str = "ATL_JDBC_URL";
pub const DB_TYPE: &str = "ATL_DB_TYPE";
pub const DB_TIMEOUT: &str = "ATL_DB_TIMEOUT";

pub const JDBC_USER: ArtifactField =
    ArtifactField::new("hibernate.connection.username", &["ATL_JDBC_USER"], "");
pub const JDBC_PASSWORD: ArtifactField =
    ArtifactField::new("hibernate.connection.password", &["ATL_JDBC_PASSWORD"], "");

/// Pool fields written for versions before 7.11.
pub const C3P0_FIELDS: &[ArtifactField] = &[
    ArtifactField::new("hibernate.c3p0.min_size", &["ATL_DB_POOLMINSIZE"], "20"),
    ArtifactField::new("hibernate.c3p0.max_size", &["ATL_DB_POOLMAXSIZE"], "100"),
    ArtifactField::new("hibernate.c3p0.timeout", &[DB_TIMEOUT], "30"),
    ArtifactField::new("hibernate.c3p0.idle_test_period", &["ATL_DB_IDLETESTPERIOD"], "100"),
    ArtifactField::new("hibernate.c3p0.max_statements", &["ATL_DB_MAXSTATEMENTS"], "0"),
    ArtifactField::new("hibernate.c3p0.validate", &["ATL_DB_VALIDATE"], "true"),
    ArtifactField::new("hibernate.c3p0.acquire_increment", &["ATL_DB_ACQUIREINCREMENT"], "1"),
    ArtifactField::new(
        "hibernate.c3p0.preferredTestQuery",
        &["ATL_DB_VALIDATIONQUERY"],
        "select 1",
    ),
];

/// Timeout in seconds; rendered as milliseconds for the hikari pool.
pub const HIKARI_TIMEOUT: ArtifactField =
    ArtifactField::new("hibernate.hikari.idleTimeout", &[DB_TIMEOUT], "30");

pub const HIKARI_FIELDS: &[ArtifactField] = &[
    ArtifactField::new("hibernate.hikari.maximumPoolSize", &["ATL_DB_POOLMAXSIZE"], "100"),
    ArtifactField::new("hibernate.hikari.minimumIdle", &["ATL_DB_POOLMINSIZE"], "20"),
];

pub const CLUSTER_TYPE: &str = "ATL_CLUSTER_TYPE";

const CLUSTER_NAME: ArtifactField =
    ArtifactField::new("confluence.cluster.name", &["ATL_CLUSTER_NAME"], "");
const CLUSTER_TTL: ArtifactField =
    ArtifactField::new("confluence.cluster.ttl", &["ATL_CLUSTER_TTL"], "");
const CLUSTER_ADDRESS: ArtifactField =
    ArtifactField::new("confluence.cluster.address", &["ATL_CLUSTER_ADDRESS"], "");
const CLUSTER_PEERS: ArtifactField =
    ArtifactField::new("confluence.cluster.peers", &["ATL_CLUSTER_PEERS"], "");
const CLUSTER_HOME: ArtifactField =
    ArtifactField::new("confluence.cluster.home", &["ATL_CLUSTER_HOME"], "");

const AWS_FIELDS: &[ArtifactField] = &[
    ArtifactField::new(
        "confluence.cluster.aws.iam.role",
        &["ATL_HAZELCAST_NETWORK_AWS_IAM_ROLE"],
        "",
    ),
    ArtifactField::new(
        "confluence.cluster.aws.region",
        &["ATL_HAZELCAST_NETWORK_AWS_IAM_REGION"],
        "",
    ),
    ArtifactField::new(
        "confluence.cluster.aws.host.header",
        &["ATL_HAZELCAST_NETWORK_AWS_HOST_HEADER"],
        "",
    ),
    ArtifactField::new(
        "confluence.cluster.aws.tag.key",
        &["ATL_HAZELCAST_NETWORK_AWS_TAG_KEY"],
        "",
    ),
    ArtifactField::new(
        "confluence.cluster.aws.tag.value",
        &["ATL_HAZELCAST_NETWORK_AWS_TAG_VALUE"],
        "",
    ),
];

pub const CONTEXT_PATH_VAR: &str = "ATL_TOMCAT_CONTEXTPATH";
pub const LICENSE_KEY: ArtifactField =
    ArtifactField::new("atlassian.license.message", &["ATL_LICENSE_KEY"], "");
pub const SNAPSHOT_USED: &str = "ATL_SNAPSHOT_USED";

/// Supported database types: `(type, driver class, dialect)`.
pub const DATABASES: &[(&str, &str, &str)] = &[
    (
        "postgresql",
        "org.postgresql.Driver",
        "com.atlassian.confluence.impl.hibernate.dialect.PostgreSQLDialect",
    ),
    (
        "mysql",
        "com.mysql.jdbc.Driver",
        "com.atlassian.confluence.impl.hibernate.dialect.MySQLDialect",
    ),
    (
        "mssql",
        "com.microsoft.sqlserver.jdbc.SQLServerDriver",
        "com.atlassian.confluence.impl.hibernate.dialect.SQLServerDialect",
    ),
    (
        "oracle12c",
        "oracle.jdbc.driver.OracleDriver",
        "com.atlassian.confluence.impl.hibernate.dialect.OracleDialect",
    ),
    (
        "h2",
        "org.h2.Driver",
        "com.atlassian.confluence.impl.hibernate.dialect.H2Dialect",
    ),
];

/// Cluster discovery mechanism selected by `ATL_CLUSTER_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Aws,
    Multicast,
    TcpIp,
}

impl JoinType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "aws" => Some(JoinType::Aws),
            "multicast" => Some(JoinType::Multicast),
            "tcp_ip" => Some(JoinType::TcpIp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Aws => "aws",
            JoinType::Multicast => "multicast",
            JoinType::TcpIp => "tcp_ip",
        }
    }

    /// Fields that must be supplied, in render order.
    fn required(&self) -> Vec<ArtifactField> {
        match self {
            JoinType::Aws => AWS_FIELDS.to_vec(),
            JoinType::Multicast => vec![CLUSTER_NAME, CLUSTER_TTL, CLUSTER_ADDRESS],
            JoinType::TcpIp => vec![CLUSTER_NAME, CLUSTER_PEERS],
        }
    }

    /// Fields written when supplied, in render order.
    fn optional(&self) -> Vec<ArtifactField> {
        match self {
            JoinType::Aws => vec![CLUSTER_NAME, CLUSTER_TTL],
            JoinType::Multicast | JoinType::TcpIp => vec![],
        }
    }
}

fn property(name: &str, value: impl Into<String>) -> Element {
    Element::new("property").attr("name", name).text(value)
}

/// Prepend `/` to a context path that lacks one.
pub fn normalize_context_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    }
}

fn database_section(
    env: &EnvironmentView,
    version: Option<VersionToken>,
    trace: &mut Trace,
) -> ResolveResult<Vec<Element>> {
    if !env.contains(JDBC_URL) && !env.contains(DB_TYPE) {
        return Ok(Vec::new());
    }

    let mode = "configuring a database";
    let url = env
        .get(JDBC_URL)
        .ok_or_else(|| ResolveError::missing_field(JDBC_URL, mode))?;
    let db_type = env
        .get(DB_TYPE)
        .ok_or_else(|| ResolveError::missing_field(DB_TYPE, mode))?;
    let (_, driver, dialect) = DATABASES
        .iter()
        .find(|(name, _, _)| *name == db_type)
        .ok_or_else(|| ResolveError::unknown_database_type(db_type))?;

    let mut props = vec![
        property(
            "confluence.database.choice",
            trace.record("confluence.database.choice", db_type, Origin::Env(DB_TYPE.into())),
        ),
        property(
            "hibernate.connection.url",
            trace.record("hibernate.connection.url", url, Origin::Env(JDBC_URL.into())),
        ),
        property(JDBC_USER.name, trace.take(&JDBC_USER, env, version)),
        property(JDBC_PASSWORD.name, trace.take(&JDBC_PASSWORD, env, version)),
        property(
            "hibernate.connection.driver_class",
            trace.record("hibernate.connection.driver_class", *driver, Origin::Derived),
        ),
        property(
            "hibernate.dialect",
            trace.record("hibernate.dialect", *dialect, Origin::Derived),
        ),
    ];

    props.extend(pool_section(env, version, trace));
    Ok(props)
}

/// Pool properties for whichever family applies to `version`.
pub(crate) fn pool_section(
    env: &EnvironmentView,
    version: Option<VersionToken>,
    trace: &mut Trace,
) -> Vec<Element> {
    if !version::satisfies(version, ACCESS_LOG_AND_HIKARI_SINCE) {
        return C3P0_FIELDS
            .iter()
            .map(|f| property(f.name, trace.take(f, env, version)))
            .collect();
    }

    // Whole seconds are converted; anything else is written as given.
    let seconds = HIKARI_TIMEOUT.resolve(env, version);
    let millis = seconds
        .value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|s| s.checked_mul(1000));
    let idle_timeout = match millis {
        Some(millis) => trace.record(HIKARI_TIMEOUT.name, millis.to_string(), Origin::Derived),
        None => {
            warn!(
                var = DB_TIMEOUT,
                value = %seconds.value,
                "Timeout is not a whole number of seconds, writing it unconverted"
            );
            trace.record(HIKARI_TIMEOUT.name, seconds.value, seconds.origin)
        }
    };

    let mut props = vec![property(HIKARI_TIMEOUT.name, idle_timeout)];
    props.extend(
        HIKARI_FIELDS
            .iter()
            .map(|f| property(f.name, trace.take(f, env, version))),
    );
    props.push(property(
        "hibernate.hikari.registerMbeans",
        trace.record("hibernate.hikari.registerMbeans", "true", Origin::Fixed),
    ));
    props
}

fn cluster_section(env: &EnvironmentView, trace: &mut Trace) -> ResolveResult<Vec<Element>> {
    let Some(raw) = env.get(CLUSTER_TYPE) else {
        return Ok(Vec::new());
    };
    let join = JoinType::from_str(raw).ok_or_else(|| ResolveError::unknown_join_type(raw))?;
    let mode = format!("{}={}", CLUSTER_TYPE, join.as_str());

    // Validate the whole set before producing anything.
    for field in join.required() {
        if !field.sources.iter().any(|s| env.contains(s)) {
            return Err(ResolveError::missing_field(field.sources[0], &mode));
        }
    }

    let mut props = vec![
        property(
            "confluence.cluster",
            trace.record("confluence.cluster", "true", Origin::Fixed),
        ),
        property(
            "confluence.cluster.join.type",
            trace.record(
                "confluence.cluster.join.type",
                join.as_str(),
                Origin::Env(CLUSTER_TYPE.into()),
            ),
        ),
    ];

    for field in join.required() {
        props.push(property(field.name, trace.take(&field, env, None)));
    }
    for field in join.optional() {
        if field.sources.iter().any(|s| env.contains(s)) {
            props.push(property(field.name, trace.take(&field, env, None)));
        }
    }
    if env.contains(CLUSTER_HOME.sources[0]) {
        props.push(property(CLUSTER_HOME.name, trace.take(&CLUSTER_HOME, env, None)));
    }

    Ok(props)
}

pub(crate) fn build(
    env: &EnvironmentView,
    version: Option<VersionToken>,
    trace: &mut Trace,
) -> ResolveResult<Artifact> {
    let mut props = vec![
        property("confluence.database.connection.type", "database-type-standard"),
        property("webwork.multipart.saveDir", "${localHome}/temp"),
        property("attachments.dir", "${confluenceHome}/attachments"),
        property(LUCENE_INDEX_DIR.name, trace.take(&LUCENE_INDEX_DIR, env, version)),
    ];

    props.extend(database_section(env, version, trace)?);
    props.extend(cluster_section(env, trace)?);

    // An empty path means the root context; nothing to record.
    if let Some(raw) = env.get(CONTEXT_PATH_VAR).filter(|p| !p.is_empty()) {
        let path = normalize_context_path(raw);
        props.push(property(
            "confluence.webapp.context.path",
            trace.record(
                "confluence.webapp.context.path",
                path,
                Origin::Env(CONTEXT_PATH_VAR.into()),
            ),
        ));
    }

    if env.contains(LICENSE_KEY.sources[0]) {
        props.push(property(LICENSE_KEY.name, trace.take(&LICENSE_KEY, env, version)));
    }

    if env.flag_or(SNAPSHOT_USED, false) {
        props.push(property(
            "hibernate.setup",
            trace.record("hibernate.setup", "true", Origin::Env(SNAPSHOT_USED.into())),
        ));
    }

    let root = Element::new("confluence-configuration")
        .child(Element::new("setupStep").text(trace.take(&SETUP_STEP, env, version)))
        .child(Element::new("setupType").text(trace.take(&SETUP_TYPE, env, version)))
        .child(Element::new("buildNumber").text(trace.take(&BUILD_NUMBER, env, version)))
        .child(Element::new("properties").children(props));

    Ok(Artifact::xml(root))
}
