//! Startup configuration: database credentials, the salary table name and
//! server settings.
//!
//! Credentials come from the `db_host`, `db_port`, `db_name`, `db_user` and
//! `db_password` environment variables, or are typed in at the prompt.

use crate::error::{DashboardError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::io::{BufRead, Write};

lazy_static! {
    static ref IDENTIFIER_REGEX: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap();
}

pub const DEFAULT_TABLE: &str = "asu_employee_salary_data";
pub const DEFAULT_BIND: &str = "127.0.0.1:8050";

const ENV_HOST: &str = "db_host";
const ENV_PORT: &str = "db_port";
const ENV_NAME: &str = "db_name";
const ENV_USER: &str = "db_user";
const ENV_PASSWORD: &str = "db_password";

/// The five values needed to open the PostgreSQL pool.
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"********")
            .finish()
    }
}

impl DbCredentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| DashboardError::config(format!("environment variable {key} is not set")))
        };

        Ok(DbCredentials {
            host: require(ENV_HOST)?,
            port: parse_port(&require(ENV_PORT)?)?,
            database: require(ENV_NAME)?,
            user: require(ENV_USER)?,
            password: require(ENV_PASSWORD)?,
        })
    }

    /// Ask on `output` whether the environment holds the credentials; if
    /// not, prompt for each value in turn.
    pub fn prompt<R, W, F>(input: &mut R, output: &mut W, lookup: F) -> Result<Self>
    where
        R: BufRead,
        W: Write,
        F: Fn(&str) -> Option<String>,
    {
        let answer = ask(
            input,
            output,
            "Do you have environment variables for db_host, db_port, db_name, db_user, and db_password (Y/N)? : ",
        )?;

        if answer.eq_ignore_ascii_case("y") {
            return Self::from_lookup(lookup);
        }

        let host = ask(input, output, "Enter the database host: ")?;
        let port = ask(input, output, "Enter the database port: ")?;
        let database = ask(input, output, "Enter the database name: ")?;
        let user = ask(input, output, "Enter the database username: ")?;
        let password = ask(input, output, "Enter the database password: ")?;

        Ok(DbCredentials {
            host,
            port: parse_port(&port)?,
            database,
            user,
            password,
        })
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(DashboardError::config("input closed before credentials were entered"));
    }
    Ok(line.trim().to_string())
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| DashboardError::config(format!("invalid port: {raw:?}")))
}

/// A table name that is safe to splice into SQL text.
///
/// Values are always bound as parameters, but identifiers cannot be, so
/// the name is checked against a plain (optionally schema-qualified)
/// identifier pattern instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn parse(raw: &str) -> Result<Self> {
        if IDENTIFIER_REGEX.is_match(raw) {
            Ok(TableName(raw.to_string()))
        } else {
            Err(DashboardError::config(format!("invalid table name: {raw:?}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        TableName(DEFAULT_TABLE.to_string())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Command line flags for the dashboard binary.
#[cfg(feature = "web")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "salary-dashboard", about = "Salary analysis by department")]
pub struct Cli {
    /// Address the web server listens on
    #[arg(long, default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Rows per page in the data table
    #[arg(long, default_value_t = crate::table::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Salary table to query
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Serve records from a CSV file instead of PostgreSQL
    #[arg(long)]
    pub csv: Option<std::path::PathBuf>,

    /// Read credentials from the environment without asking
    #[arg(long)]
    pub use_env: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Cursor;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("db_host", "db.internal"),
            ("db_port", "5432"),
            ("db_name", "payroll"),
            ("db_user", "analyst"),
            ("db_password", "secret"),
        ])
    }

    #[test]
    fn test_credentials_from_environment() {
        let vars = full_env();
        let creds = DbCredentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.host, "db.internal");
        assert_eq!(creds.port, 5432);
        assert_eq!(creds.database, "payroll");
    }

    #[test]
    fn test_missing_variable_is_reported() {
        let mut vars = full_env();
        vars.remove("db_user");
        let err = DbCredentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("db_user"));
    }

    #[test]
    fn test_prompt_answering_yes_uses_environment() {
        let vars = full_env();
        let mut input = Cursor::new("y\n");
        let mut output = Vec::new();
        let creds =
            DbCredentials::prompt(&mut input, &mut output, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.user, "analyst");
        assert!(String::from_utf8(output).unwrap().contains("(Y/N)"));
    }

    #[test]
    fn test_prompt_reads_each_value() {
        let mut input = Cursor::new("N\nlocalhost\n6543\nhr\nreader\npw\n");
        let mut output = Vec::new();
        let creds = DbCredentials::prompt(&mut input, &mut output, |_| None).unwrap();
        assert_eq!(
            creds,
            DbCredentials {
                host: "localhost".to_string(),
                port: 6543,
                database: "hr".to_string(),
                user: "reader".to_string(),
                password: "pw".to_string(),
            }
        );
    }

    #[test]
    fn test_prompt_rejects_bad_port_and_closed_input() {
        let mut input = Cursor::new("n\nlocalhost\nnot-a-port\nhr\nreader\npw\n");
        assert!(DbCredentials::prompt(&mut input, &mut Vec::new(), |_| None).is_err());

        let mut closed = Cursor::new("n\nlocalhost\n");
        assert!(DbCredentials::prompt(&mut closed, &mut Vec::new(), |_| None).is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let vars = full_env();
        let creds = DbCredentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn test_table_name_validation() {
        assert!(TableName::parse("asu_employee_salary_data").is_ok());
        assert!(TableName::parse("hr.salaries").is_ok());
        assert!(TableName::parse("salaries; DROP TABLE x").is_err());
        assert!(TableName::parse("1table").is_err());
        assert_eq!(TableName::default().as_str(), DEFAULT_TABLE);
    }
}
