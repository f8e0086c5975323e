//! Command-line surface of the portal binary.

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "portal")]
#[command(author, version, about = "IoT learning portal: projects, progress and section unlocks", long_about = None)]
pub struct Cli {
    /// SQLite database URL or file path
    #[arg(long = "db", env = "PORTAL_DB_URL", default_value = "sqlite://portal.sqlite3")]
    pub db_url: String,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(short, long, env = "PORTAL_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and remember the user for later commands
    Login {
        email: String,
        /// Prefer `PORTAL_PASSWORD` so the password stays out of shell history
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the signed-in user
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List projects (admins also see hidden ones)
    Projects,

    /// Show one project in detail
    Show {
        /// Project id
        id: String,
    },

    /// Mark a project complete
    Complete {
        /// Project id
        id: String,
    },

    /// Show progress per section and overall
    Progress,

    /// Clear your completions and relock sections past the first
    Reset,

    /// Set the theme, or toggle it when no value is given
    Theme {
        /// `light` or `dark`
        value: Option<String>,
    },

    /// Catalog administration (admin accounts only)
    #[command(subcommand)]
    Admin(AdminCommands),
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Add a project to the catalog
    Create(ProjectFields),

    /// Change fields of an existing project
    Update {
        /// Project id
        id: String,
        #[command(flatten)]
        fields: ProjectFields,
    },

    /// Remove a project
    Delete {
        /// Project id
        id: String,
    },

    /// Hide a project from students
    Hide { id: String },

    /// Make a hidden project visible again
    Unhide { id: String },

    /// Generate a new API key for a project
    GenKey { id: String },

    /// Display the API key in plain text
    ShowKey { id: String },

    /// Mask the API key
    HideKey { id: String },

    /// Set the API endpoint, or clear it when no URL is given
    Endpoint { id: String, url: Option<String> },

    /// Set the API client settings
    Config {
        id: String,
        #[arg(long, default_value_t = 100)]
        rate_limit: u32,
        /// Milliseconds
        #[arg(long, default_value_t = 30)]
        timeout: u32,
        #[arg(long, default_value_t = 3)]
        retries: u32,
    },
}

/// Editable project fields. On `update`, omitted flags keep their current value.
#[derive(Args, Debug, Default)]
pub struct ProjectFields {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// easy, intermediate or advanced
    #[arg(long)]
    pub difficulty: Option<String>,

    #[arg(long)]
    pub section: Option<u32>,

    #[arg(long)]
    pub section_name: Option<String>,

    #[arg(long)]
    pub device_id: Option<String>,

    /// Repeat for each objective; replaces the whole list
    #[arg(long = "objective")]
    pub objectives: Vec<String>,

    #[arg(long)]
    pub hidden: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_admin_create_with_objectives() {
        let cli = Cli::try_parse_from([
            "portal",
            "--db",
            "sqlite::memory:",
            "admin",
            "create",
            "--name",
            "Blink",
            "--description",
            "LED",
            "--section",
            "2",
            "--objective",
            "wire",
            "--objective",
            "flash",
        ])
        .unwrap();

        let Commands::Admin(AdminCommands::Create(fields)) = cli.command else {
            panic!("expected admin create");
        };
        assert_eq!(fields.name.as_deref(), Some("Blink"));
        assert_eq!(fields.section, Some(2));
        assert_eq!(fields.objectives, vec!["wire", "flash"]);
        assert_eq!(cli.db_url, "sqlite::memory:");
    }

    #[test]
    fn login_password_is_not_positional() {
        assert!(Cli::try_parse_from(["portal", "login", "a@example.com", "secret"]).is_err());

        let cli = Cli::try_parse_from([
            "portal",
            "login",
            "a@example.com",
            "--password",
            "secret",
        ])
        .unwrap();
        let Commands::Login { email, password } = cli.command else {
            panic!("expected login");
        };
        assert_eq!(email, "a@example.com");
        assert_eq!(password, "secret");
    }

    #[test]
    fn theme_value_is_optional() {
        let cli = Cli::try_parse_from(["portal", "theme"]).unwrap();
        assert!(matches!(cli.command, Commands::Theme { value: None }));
    }
}
