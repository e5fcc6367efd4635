use anyhow::{bail, Context, Result};
use chrono::Local;
use gerot_api::Settings;
use gerot_core::Role;
use gerot_db::repository::DEFAULT_ADMIN_USERNAME;
use gerot_db::{Database, NewUser, SectorSummary};
use std::path::PathBuf;

use crate::cli::Commands;

pub async fn execute(command: Commands, mut settings: Settings) -> Result<()> {
    match command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.api_port = port;
            }
            println!("Starting API server on port {}...", settings.api_port);
            gerot_api::serve(settings).await?;
        }

        Commands::InitDb { admin_password } => {
            println!("Initializing database schema...");
            let db = open(&settings).await?;
            let password = admin_password.unwrap_or_else(|| settings.default_admin_password.clone());
            db.seed_defaults(&password).await?;

            println!("✓ Database initialized successfully");
            println!("  Sectors: {}", db.list_sectors().await?.len());
            println!("  RPA types: {}", db.list_rpa_types().await?.len());
            println!("  Admin user: {}", DEFAULT_ADMIN_USERNAME);
        }

        Commands::CreateUser {
            username,
            password,
            email,
            full_name,
            role,
            sector,
        } => {
            let role: Role = role.parse()?;
            let db = open(&settings).await?;

            let sector_id = match sector {
                Some(name) => Some(find_sector(&db, &name).await?.id),
                None => None,
            };

            let user = db
                .create_user(&NewUser {
                    username,
                    email,
                    password: Some(password),
                    full_name,
                    role,
                    sector_id,
                })
                .await?;

            println!("✓ User created: {}", user.id);
            println!("  Username: {}", user.username);
            println!("  Role: {}", user.role);
            if let Some(email) = &user.email {
                println!("  Email: {}", email);
            }
        }

        Commands::ResetPassword { username, password } => {
            let db = open(&settings).await?;
            let user = db
                .find_login(&username)
                .await?
                .with_context(|| format!("User not found: {}", username))?;

            db.set_password(user.id, &password).await?;
            println!("✓ Password updated for {}", user.username);
        }

        Commands::ListUsers { sector } => {
            let db = open(&settings).await?;
            let sectors = db.list_sectors().await?;

            let sector_id = match sector {
                Some(name) => Some(find_sector(&db, &name).await?.id),
                None => None,
            };
            let users = db.list_users(sector_id).await?;

            println!("Users: {}", users.len());
            println!();
            for user in users {
                let sector_name = user
                    .sector_id
                    .and_then(|id| sectors.iter().find(|s| s.id == id))
                    .map(|s| s.name.as_str())
                    .unwrap_or("-");

                println!("ID: {}", user.id);
                println!("  Username: {}", user.username);
                println!("  Name: {}", user.display_name());
                println!("  Role: {}", user.role);
                println!("  Sector: {}", sector_name);
                if !user.is_active {
                    println!("  Inactive");
                }
                println!();
            }
        }

        Commands::Stats { date } => {
            let db = open(&settings).await?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());

            println!("GeRot Statistics ({})\n", date);

            let global = db.global_stats(date).await?;
            println!("Checklist:");
            println!("  Routines: {}", global.routines_today);
            println!("  Tasks: {}", global.tasks_today);
            println!("  Completed: {} ({}%)", global.completed_today, global.percentage);

            let sectors = db.sector_stats_on(date, None).await?;
            if !sectors.is_empty() {
                println!("\nSectors:");
                for sector in sectors {
                    println!(
                        "  {}: {} members, {}/{} tasks ({}%)",
                        sector.name,
                        sector.team_members,
                        sector.completed_tasks,
                        sector.total_tasks,
                        sector.percentage
                    );
                }
            }

            let counts = db.table_counts().await?;
            println!("\nDatabase:");
            println!("  Users: {} ({} active)", counts.users, counts.active_users);
            println!(
                "  Roles: {} admin, {} lider, {} colaborador",
                counts.admin_masters, counts.lideres, counts.colaboradores
            );
            println!("  Sectors: {}", counts.sectors);
            println!("  Routines: {}", counts.routines);
            println!(
                "  Checklist items: {} ({} completed)",
                counts.checklist_items, counts.completed_items
            );
            println!("  Activity entries: {}", counts.activity_logs);
            println!("  Pending RPAs: {}", counts.pending_rpas);
        }

        Commands::Backup { output } => {
            let db = open(&settings).await?;
            let path = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "gerot-backup-{}.db",
                    Local::now().format("%Y%m%d-%H%M%S")
                ))
            });

            db.backup_to(&path).await?;
            println!("✓ Backup written to {}", path.display());
        }

        Commands::MigrateRoles => {
            let db = open(&settings).await?;
            let migrated = db.migrate_legacy_roles().await?;
            println!("✓ Roles migrated: {} user(s) updated", migrated);
        }

        Commands::Check => {
            check(&settings).await?;
        }
    }

    Ok(())
}

async fn open(settings: &Settings) -> Result<Database> {
    let db = Database::new(&settings.database_url)
        .await
        .with_context(|| format!("Could not open {}", settings.database_url))?;
    db.init_schema().await?;
    Ok(db)
}

async fn find_sector(db: &Database, name: &str) -> Result<SectorSummary> {
    let sectors = db.list_sectors().await?;
    match sectors
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    {
        Some(sector) => Ok(sector),
        None => bail!("Sector not found: {}", name),
    }
}

async fn check(settings: &Settings) -> Result<()> {
    println!("Configuration:");
    if settings.uses_dev_secret() {
        println!("  ⚠ SECRET_KEY not set, using the development key");
    } else {
        println!("  ✓ SECRET_KEY set");
    }
    if settings.agent_key().is_some() {
        println!("  ✓ AGENT_API_KEY set");
    } else {
        println!("  ⚠ AGENT_API_KEY not set, agent endpoints are open");
    }
    match &settings.allowed_email_domain {
        Some(domain) => println!("  ✓ E-mail domain restricted to {}", domain),
        None => println!("  - Any e-mail domain accepted"),
    }

    println!("\nDatabase: {}", settings.database_url);
    let db = open(settings).await?;
    db.ping().await?;
    println!("  ✓ Connection OK");

    let counts = db.table_counts().await?;
    println!("  ✓ Schema OK ({} users, {} sectors)", counts.users, counts.sectors);

    let pruned = db.prune_sessions().await?;
    if pruned > 0 {
        println!("  ✓ Removed {} stale session(s)", pruned);
    }

    match db.get_user_by_username(DEFAULT_ADMIN_USERNAME).await? {
        Some(admin) if admin.first_login => {
            println!("  ⚠ {} still has its initial password", DEFAULT_ADMIN_USERNAME)
        }
        Some(_) => println!("  ✓ {} present", DEFAULT_ADMIN_USERNAME),
        None if counts.admin_masters > 0 => println!("  ✓ Admin account present"),
        None => println!("  ⚠ No admin account, run `gerot init-db`"),
    }

    Ok(())
}
