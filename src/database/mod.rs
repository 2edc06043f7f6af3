//! Managed PostgreSQL database: version parsing and read-only probes

mod probe;
mod version;

pub use probe::{
    deployment_config_containers, ClusterDatabaseProbe, ConnectionParams, DatabaseProbe,
    DATABASE_CONTAINER, DATABASE_DEPLOYMENT, VERSION_INIT_CONTAINER,
};
pub use version::PostgresVersion;
