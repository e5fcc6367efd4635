use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gerot")]
#[command(about = "GeRot - routine management administration", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on (overrides API_PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create tables, default sectors, RPA types and the first admin
    InitDb {
        /// Password for the admin_master account when it does not exist yet
        #[arg(long, env = "DEFAULT_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,
    },

    /// Create a user
    CreateUser {
        /// Login name
        #[arg(long)]
        username: String,

        /// Initial password
        #[arg(long)]
        password: String,

        /// E-mail address
        #[arg(long)]
        email: Option<String>,

        /// Full name
        #[arg(long)]
        full_name: Option<String>,

        /// admin_master, lider or colaborador
        #[arg(long, default_value = "colaborador")]
        role: String,

        /// Sector name
        #[arg(long)]
        sector: Option<String>,
    },

    /// Set a new password for a user
    ResetPassword {
        /// Login name or e-mail
        username: String,

        /// New password
        #[arg(long)]
        password: String,
    },

    /// List users
    ListUsers {
        /// Only users of this sector (name)
        #[arg(long)]
        sector: Option<String>,
    },

    /// Show statistics
    Stats {
        /// Day to report (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Copy the database to a new file
    Backup {
        /// Target file (defaults to gerot-backup-<timestamp>.db)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Rewrite legacy role names (manager, team_member, ...)
    MigrateRoles,

    /// Check configuration and database health
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_user() {
        let cli = Cli::try_parse_from([
            "gerot",
            "create-user",
            "--username",
            "maria.souza",
            "--password",
            "segredo1",
            "--role",
            "lider",
            "--sector",
            "Operacional",
        ])
        .unwrap();

        match cli.command {
            Commands::CreateUser {
                username,
                role,
                sector,
                email,
                ..
            } => {
                assert_eq!(username, "maria.souza");
                assert_eq!(role, "lider");
                assert_eq!(sector.as_deref(), Some("Operacional"));
                assert!(email.is_none());
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_global_database_url() {
        let cli = Cli::try_parse_from([
            "gerot",
            "stats",
            "--database-url",
            "sqlite::memory:",
            "--date",
            "2024-03-01",
        ])
        .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        assert!(matches!(
            cli.command,
            Commands::Stats { date: Some(d) } if d == NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        ));
    }
}
