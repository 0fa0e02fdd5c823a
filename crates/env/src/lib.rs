use std::{env::var, net::SocketAddr, path::PathBuf, sync::Arc};

use eyre::{eyre, Context, Error};

const DEFAULT_RPC_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_BACKUP_DIR: &str = "backups";
const DEFAULT_BACKUP_CRON: &str = "0 0 3 * * *";

#[derive(Clone)]
pub struct Env(Arc<EnvInner>);

#[derive(Clone)]
pub struct EnvInner {
    mongo_url: String,
    jwt_secret: String,
    rpc_addr: SocketAddr,
    backup_dir: PathBuf,
    backup_cron: String,
}

impl Env {
    pub fn mongo_url(&self) -> &str {
        &self.0.mongo_url
    }

    pub fn jwt_secret(&self) -> &str {
        &self.0.jwt_secret
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        self.0.rpc_addr
    }

    pub fn backup_dir(&self) -> &PathBuf {
        &self.0.backup_dir
    }

    pub fn backup_cron(&self) -> &str {
        &self.0.backup_cron
    }

    /// Reads the process environment. `.env` is loaded by the binary first.
    pub fn load() -> Result<Env, Error> {
        Env::from_lookup(|name| var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Env, Error> {
        let required = |name: &str| lookup(name).ok_or_else(|| eyre!("{} is not set", name));
        let optional =
            |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_owned());

        let rpc_addr = optional("RPC_ADDR", DEFAULT_RPC_ADDR);
        Ok(Env(Arc::new(EnvInner {
            mongo_url: required("MONGO_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            rpc_addr: rpc_addr
                .parse()
                .with_context(|| format!("RPC_ADDR is invalid: {}", rpc_addr))?,
            backup_dir: PathBuf::from(optional("BACKUP_DIR", DEFAULT_BACKUP_DIR)),
            backup_cron: optional("BACKUP_CRON", DEFAULT_BACKUP_CRON),
        })))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let env = Env::from_lookup(lookup(&[
            ("MONGO_URL", "mongodb://localhost:27017"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(env.mongo_url(), "mongodb://localhost:27017");
        assert_eq!(env.jwt_secret(), "secret");
        assert_eq!(env.rpc_addr(), "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(env.backup_dir(), &PathBuf::from("backups"));
        assert_eq!(env.backup_cron(), "0 0 3 * * *");
    }

    #[test]
    fn test_missing_secret() {
        let err = Env::from_lookup(lookup(&[("MONGO_URL", "mongodb://localhost")]))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "JWT_SECRET is not set");
    }

    #[test]
    fn test_invalid_addr() {
        assert!(Env::from_lookup(lookup(&[
            ("MONGO_URL", "mongodb://localhost"),
            ("JWT_SECRET", "secret"),
            ("RPC_ADDR", "localhost"),
        ]))
        .is_err());
    }
}
