use anyhow::{Context, Result, anyhow, bail};

use portal_core::model::{
    ApiConfig, Difficulty, ProgressCount, Project, ProjectDraft, ProjectId, Theme,
};
use services::{AppServices, Session};

use crate::cli::{AdminCommands, Commands, ProjectFields};

pub async fn dispatch(services: &AppServices, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email, password } => login(services, &email, &password).await,
        Commands::Logout => {
            services.identity().logout().await?;
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => whoami(services).await,
        Commands::Projects => projects(services).await,
        Commands::Show { id } => show(services, &ProjectId::new(id)).await,
        Commands::Complete { id } => complete(services, &ProjectId::new(id)).await,
        Commands::Progress => progress(services).await,
        Commands::Reset => {
            let session = require_session(services).await?;
            services.progress().reset(session.user_id()).await?;
            println!("Progress cleared. Section 1 is open again.");
            Ok(())
        }
        Commands::Theme { value } => theme(services, value.as_deref()).await,
        Commands::Admin(admin_command) => {
            let session = require_session(services).await?;
            if !session.is_admin() {
                bail!("admin privileges required");
            }
            admin(services, &session, admin_command).await
        }
    }
}

async fn require_session(services: &AppServices) -> Result<Session> {
    services
        .identity()
        .current_session()
        .await?
        .ok_or_else(|| {
            anyhow!("not signed in; set PORTAL_PASSWORD and run `portal login <email>` first")
        })
}

async fn login(services: &AppServices, email: &str, password: &str) -> Result<()> {
    match services.identity().login(email, password).await? {
        Some(session) => {
            let role = if session.is_admin() { "admin" } else { "student" };
            println!("Signed in as {} ({role}).", session.user().name());
            Ok(())
        }
        None => bail!("invalid email or password"),
    }
}

async fn whoami(services: &AppServices) -> Result<()> {
    match services.identity().current_session().await? {
        Some(session) => {
            let user = session.user();
            println!("{} <{}>", user.name(), user.email());
            println!("id:    {}", user.id());
            println!("admin: {}", user.is_admin());
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

async fn projects(services: &AppServices) -> Result<()> {
    let session = require_session(services).await?;

    if session.is_admin() {
        let all = services.catalog().all_projects().await?;
        if all.is_empty() {
            println!("The catalog is empty.");
        }
        for project in &all {
            let hidden = if project.hidden() { " [hidden]" } else { "" };
            println!(
                "{}  S{} {:<12} {}{hidden}",
                project.id(),
                project.section(),
                project.difficulty().as_str(),
                project.name()
            );
        }
        return Ok(());
    }

    for row in services.progress().dashboard(session.user_id()).await? {
        let state = if row.unlocked { "open" } else { "locked" };
        println!(
            "Section {} ({}) {state}: {}/{}",
            row.number, row.difficulty, row.progress.completed, row.progress.total
        );
        if !row.unlocked {
            continue;
        }
        for project in &row.projects {
            let done = services
                .progress()
                .is_complete(session.user_id(), project.id())
                .await?;
            let mark = if done { "x" } else { " " };
            println!("  [{mark}] {}  {}", project.id(), project.name());
        }
    }
    Ok(())
}

/// Resolve a project the signed-in user may see: admins see everything,
/// students only visible projects in unlocked sections.
async fn accessible_project(
    services: &AppServices,
    session: &Session,
    id: &ProjectId,
) -> Result<Project> {
    let project = services
        .catalog()
        .find_project(id)
        .await?
        .filter(|p| session.is_admin() || !p.hidden())
        .ok_or_else(|| anyhow!("no project with id {id}"))?;

    if !session.is_admin()
        && !services
            .progress()
            .is_section_unlocked(session.user_id(), project.section())
            .await?
    {
        bail!("section {} is still locked", project.section());
    }
    Ok(project)
}

async fn show(services: &AppServices, id: &ProjectId) -> Result<()> {
    let session = require_session(services).await?;
    let project = accessible_project(services, &session, id).await?;
    let done = services
        .progress()
        .is_complete(session.user_id(), project.id())
        .await?;

    println!("{}", project.name());
    println!("  id:          {}", project.id());
    println!("  description: {}", project.description());
    println!(
        "  section:     {} ({}), {}",
        project.section(),
        project.section_name(),
        project.difficulty()
    );
    if !project.device_id().is_empty() {
        println!("  device:      {}", project.device_id());
    }
    println!("  completed:   {done}");
    for objective in project.objectives() {
        println!("  - {objective}");
    }
    if let Some(key) = project.api_key_display() {
        println!("  api key:     {key}");
    }
    if let Some(endpoint) = project.api_endpoint() {
        println!("  endpoint:    {endpoint}");
    }
    if session.is_admin() {
        let config = project.effective_api_config();
        println!(
            "  api config:  {} req/min, {} ms timeout, {} retries",
            config.rate_limit, config.timeout, config.retries
        );
        println!("  hidden:      {}", project.hidden());
    }
    Ok(())
}

async fn complete(services: &AppServices, id: &ProjectId) -> Result<()> {
    let session = require_session(services).await?;
    let project = accessible_project(services, &session, id).await?;

    let unlocked = services
        .progress()
        .complete(session.user_id(), project.id())
        .await?;
    println!("Completed {}.", project.name());
    if let Some(section) = unlocked {
        println!("Section {section} unlocked!");
    }
    Ok(())
}

async fn progress(services: &AppServices) -> Result<()> {
    let session = require_session(services).await?;
    let user_id = session.user_id();
    let progress = services.progress();

    let overall = progress.overall_progress(user_id).await?;
    println!(
        "Overall: {}/{} ({}%)",
        overall.completed,
        overall.total,
        overall.rounded_percent()
    );
    for row in progress.dashboard(user_id).await? {
        println!("  Section {}: {}", row.number, section_status(row.unlocked, row.progress));
    }
    println!("Theme: {}", progress.progress(user_id).await?.theme());
    Ok(())
}

fn section_status(unlocked: bool, count: ProgressCount) -> String {
    if !unlocked {
        return "locked".to_string();
    }
    if count.is_empty() {
        return "no projects yet".to_string();
    }
    let done = if count.is_complete() { ", done" } else { "" };
    format!(
        "{}/{} ({}%){done}",
        count.completed,
        count.total,
        count.rounded_percent()
    )
}

async fn theme(services: &AppServices, value: Option<&str>) -> Result<()> {
    let session = require_session(services).await?;
    let theme = match value {
        Some(raw) => {
            let theme: Theme = raw.parse()?;
            services.progress().set_theme(session.user_id(), theme).await?;
            theme
        }
        None => services.progress().toggle_theme(session.user_id()).await?,
    };
    println!("Theme: {theme}");
    Ok(())
}

async fn admin(services: &AppServices, session: &Session, command: AdminCommands) -> Result<()> {
    let catalog = services.catalog();
    match command {
        AdminCommands::Create(fields) => {
            let mut draft = ProjectDraft::default();
            fields.apply(&mut draft)?;
            let project = catalog.create_project(session, draft).await?;
            println!("Created {}.", project.id());
        }
        AdminCommands::Update { id, fields } => {
            let id = ProjectId::new(id);
            let current = catalog
                .find_project(&id)
                .await?
                .ok_or_else(|| anyhow!("no project with id {id}"))?;
            let mut draft = current.to_draft();
            fields.apply(&mut draft)?;
            catalog.update_from_draft(session, &id, draft).await?;
            println!("Updated {id}.");
        }
        AdminCommands::Delete { id } => {
            let id = ProjectId::new(id);
            if catalog.delete_project(session, &id).await? {
                println!("Deleted {id}.");
            } else {
                println!("No project with id {id}; nothing deleted.");
            }
        }
        AdminCommands::Hide { id } => {
            catalog.set_hidden(session, &ProjectId::new(id), true).await?;
            println!("Hidden.");
        }
        AdminCommands::Unhide { id } => {
            catalog.set_hidden(session, &ProjectId::new(id), false).await?;
            println!("Visible.");
        }
        AdminCommands::GenKey { id } => {
            let id = ProjectId::new(id);
            catalog.generate_api_key(session, &id).await?;
            let project = catalog
                .find_project(&id)
                .await?
                .ok_or_else(|| anyhow!("no project with id {id}"))?;
            if let Some(key) = project.api_key_display() {
                println!("New API key: {key}");
            }
        }
        AdminCommands::ShowKey { id } => {
            let project = catalog
                .set_api_key_visible(session, &ProjectId::new(id), true)
                .await?;
            match project.api_key_display() {
                Some(key) => println!("{key}"),
                None => println!("No API key yet; run `portal admin gen-key`."),
            }
        }
        AdminCommands::HideKey { id } => {
            catalog
                .set_api_key_visible(session, &ProjectId::new(id), false)
                .await?;
            println!("API key masked.");
        }
        AdminCommands::Endpoint { id, url } => {
            let project = catalog
                .set_api_endpoint(session, &ProjectId::new(id), url)
                .await?;
            println!("Endpoint: {}", project.api_endpoint().unwrap_or("(none)"));
        }
        AdminCommands::Config {
            id,
            rate_limit,
            timeout,
            retries,
        } => {
            let config = ApiConfig::new(rate_limit, timeout, retries)?;
            catalog
                .set_api_config(session, &ProjectId::new(id), config)
                .await?;
            println!("API config saved.");
        }
    }
    Ok(())
}

impl ProjectFields {
    /// Overwrite the draft with every flag that was given.
    fn apply(self, draft: &mut ProjectDraft) -> Result<()> {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(raw) = self.difficulty {
            draft.difficulty = raw
                .parse::<Difficulty>()
                .with_context(|| format!("--difficulty {raw}"))?;
        }
        if let Some(section) = self.section {
            draft.section = section;
        }
        if let Some(section_name) = self.section_name {
            draft.section_name = section_name;
        }
        if let Some(device_id) = self.device_id {
            draft.device_id = device_id;
        }
        if !self.objectives.is_empty() {
            draft.objectives = self.objectives;
        }
        if let Some(hidden) = self.hidden {
            draft.hidden = hidden;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::time::fixed_clock;

    async fn signed_in(email: &str, password: &str) -> AppServices {
        let services = AppServices::in_memory(fixed_clock()).await.unwrap();
        dispatch(
            &services,
            Commands::Login {
                email: email.into(),
                password: password.into(),
            },
        )
        .await
        .unwrap();
        services
    }

    #[test]
    fn fields_only_override_given_flags() {
        let mut draft = ProjectDraft::new("Blink", "LED");
        draft.objectives = vec!["wire".into()];
        let fields = ProjectFields {
            section: Some(3),
            difficulty: Some("ADVANCED".into()),
            ..ProjectFields::default()
        };
        fields.apply(&mut draft).unwrap();

        assert_eq!(draft.name, "Blink");
        assert_eq!(draft.section, 3);
        assert_eq!(draft.difficulty, Difficulty::Advanced);
        assert_eq!(draft.objectives, vec!["wire"]);
    }

    #[test]
    fn section_status_covers_empty_partial_and_done() {
        assert_eq!(section_status(false, ProgressCount::new(1, 2)), "locked");
        assert_eq!(section_status(true, ProgressCount::new(0, 0)), "no projects yet");
        assert_eq!(section_status(true, ProgressCount::new(1, 3)), "1/3 (33%)");
        assert_eq!(section_status(true, ProgressCount::new(2, 2)), "2/2 (100%), done");
    }

    #[tokio::test]
    async fn students_cannot_run_admin_commands() {
        let services = signed_in("student@example.com", "Student123!").await;
        let err = dispatch(
            &services,
            Commands::Admin(AdminCommands::Delete { id: "x".into() }),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("admin"));
    }

    #[tokio::test]
    async fn bad_login_is_an_error() {
        let services = AppServices::in_memory(fixed_clock()).await.unwrap();
        let result = dispatch(
            &services,
            Commands::Login {
                email: "admin@example.com".into(),
                password: "nope".into(),
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn locked_projects_cannot_be_completed() {
        let services = signed_in("admin@example.com", "Admin123!").await;
        let fields = ProjectFields {
            name: Some("Sensor".into()),
            description: Some("Read it".into()),
            section: Some(2),
            ..ProjectFields::default()
        };
        dispatch(&services, Commands::Admin(AdminCommands::Create(fields)))
            .await
            .unwrap();
        let id = services.catalog().all_projects().await.unwrap()[0]
            .id()
            .to_string();

        dispatch(
            &services,
            Commands::Login {
                email: "student@example.com".into(),
                password: "Student123!".into(),
            },
        )
        .await
        .unwrap();
        let err = dispatch(&services, Commands::Complete { id })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("locked"));
    }
}
