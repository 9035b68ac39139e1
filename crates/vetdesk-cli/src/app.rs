//! Application shell for the vetdesk CLI.
//!
//! Builds the session and API client from configuration, runs one command,
//! and reacts to session events (for instance sending the user back to
//! `vetdesk login` once the session can no longer be refreshed).

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vetdesk_core::api::PendingRequest;
use vetdesk_core::import::{
    self, save_exam_with_attachments, AttachmentError, CsvFile, ExamTarget, ImportOptions,
    PendingAttachment,
};
use vetdesk_core::models::{DeliveryOrder, ExamDraft, ProductKind, ProductQuery, Tutor};
use vetdesk_core::utils::{
    capitalize_words, format_date, format_money, format_phone, is_valid_name, is_valid_phone,
    truncate_string,
};
use vetdesk_core::{ApiClient, Config, Session, SessionEvent};

use crate::cli::{AttachExamArgs, Commands, ImportArgs, KindArg, OutputFormat};

/// Width of the name column in list output
const NAME_COLUMN_WIDTH: usize = 32;

pub struct App {
    pub config: Config,
    pub session: Session,
    pub api: ApiClient,
    format: OutputFormat,
    events: mpsc::Receiver<SessionEvent>,
}

impl App {
    /// Create the app from config, with an optional endpoint override
    pub fn new(api_url: Option<String>, format: OutputFormat) -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        if let Some(url) = api_url {
            config.api_url = url;
        }
        debug!(api_url = %config.api_url, storage = ?config.storage, "Config loaded");

        let storage = config.token_storage().context("Failed to open token storage")?;
        let session = Session::new(storage);
        let events = session.subscribe();
        let api = ApiClient::from_config(&config, session.clone()).context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            session,
            api,
            format,
            events,
        })
    }

    /// Run one command, then handle whatever the session reported meanwhile
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        let result = self.dispatch(command).await;
        self.handle_session_events();
        result
    }

    async fn dispatch(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login { email } => self.login(email).await,
            Commands::Logout => {
                self.api.logout()?;
                println!("Logged out.");
                Ok(())
            }
            Commands::Whoami => self.whoami().await,
            Commands::Refresh => {
                self.api.refresh_session().await?;
                println!("Session refreshed.");
                Ok(())
            }
            Commands::Get { path, query } => self.get(&path, query).await,
            Commands::Products { search, kind, branch } => self.products(search, kind, branch).await,
            Commands::Tutors { search } => self.tutors(search).await,
            Commands::Deliveries { unassigned } => self.deliveries(unassigned).await,
            Commands::Stats { start, end } => self.stats(&start, &end).await,
            Commands::Import(args) => self.import(args).await,
            Commands::Template { title, fields, out } => self.template(&title, &fields, &out),
            Commands::Exams { patient_id } => self.exams(&patient_id).await,
            Commands::AttachExam(args) => self.attach_exam(args).await,
            Commands::Download { file_id, out } => self.download(&file_id, &out).await,
        }
    }

    /// React to session events emitted while the command ran
    fn handle_session_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            debug!(?event, "Session event");
            if let SessionEvent::Expired { redirect_to, reason } = event {
                info!(%redirect_to, %reason, "Redirecting to login");
                eprintln!("Your session has expired. Run `vetdesk login` to sign in again.");
            }
        }
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    // ===== Session commands =====

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => Self::prompt_email()?,
        };
        let password = match std::env::var("VETDESK_PASSWORD") {
            Ok(p) if !p.is_empty() => p,
            _ => rpassword::prompt_password("Password: ")?,
        };

        if email.trim().is_empty() || password.is_empty() {
            anyhow::bail!("Email and password required");
        }

        let login = self
            .api
            .login(email.trim(), &password)
            .await
            .map_err(|e| anyhow::anyhow!("Login failed: {}", e.user_message()))?;

        self.config.last_email = Some(email.trim().to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        info!("Login successful");
        println!("Logged in as {}.", email.trim());
        if login.show_notice {
            println!("There is a notice waiting for you in the dashboard.");
        }
        Ok(())
    }

    fn prompt_email() -> Result<String> {
        print!("Email: ");
        io::stdout().flush()?;

        let mut email = String::new();
        io::stdin().read_line(&mut email)?;
        Ok(email.trim().to_string())
    }

    async fn whoami(&self) -> Result<()> {
        let user = self.api.current_user().await?;
        if self.format.is_json() {
            return self.print_json(&user);
        }

        println!("{}", user.display_name());
        let roles = if user.roles.is_empty() {
            user.role.clone().unwrap_or_else(|| "-".to_string())
        } else {
            user.roles.join(", ")
        };
        println!("Roles: {}", roles);
        if user.is_superadmin() {
            println!("Superadmin: every permission granted");
        }
        Ok(())
    }

    // ===== Data commands =====

    async fn get(&self, path: &str, query: Vec<(String, String)>) -> Result<()> {
        let request = query
            .into_iter()
            .fold(PendingRequest::get(path), |req, (k, v)| req.query(k, v));
        let value: serde_json::Value = self.api.execute_json(request).await?;
        self.print_json(&value)
    }

    async fn products(
        &self,
        search: Option<String>,
        kind: Option<KindArg>,
        branch_id: Option<String>,
    ) -> Result<()> {
        let query = ProductQuery {
            search,
            kind: kind.map(|k| match k {
                KindArg::Product => ProductKind::Product,
                KindArg::Service => ProductKind::Service,
            }),
            branch_id,
        };
        let products = self.api.list_products(&query).await?;
        if self.format.is_json() {
            return self.print_json(&products);
        }

        for p in &products {
            let stock = match p.stock {
                Some(s) if p.is_low_stock() => format!("{} (low)", s),
                Some(s) => s.to_string(),
                None => "-".to_string(),
            };
            println!(
                "{:<width$} {:>12} {:>10}",
                truncate_string(&p.name, NAME_COLUMN_WIDTH),
                format_money(p.sale_price),
                stock,
                width = NAME_COLUMN_WIDTH
            );
        }
        println!("{} products", products.len());
        Ok(())
    }

    async fn tutors(&self, search: Option<String>) -> Result<()> {
        let tutors = self.api.list_tutors(search.as_deref()).await?;
        if self.format.is_json() {
            return self.print_json(&tutors);
        }

        for t in &tutors {
            println!("{}", tutor_row(t));
        }
        println!("{} tutors", tutors.len());
        Ok(())
    }

    async fn deliveries(&self, unassigned_only: bool) -> Result<()> {
        let mut orders = self.api.pending_deliveries().await?;
        if unassigned_only {
            orders.retain(|o| !o.is_assigned());
        }
        if self.format.is_json() {
            return self.print_json(&orders);
        }

        for order in &orders {
            println!("{}", delivery_row(order));
        }
        println!("{} deliveries", orders.len());
        Ok(())
    }

    async fn stats(&self, start: &str, end: &str) -> Result<()> {
        let stats = self.api.sales_stats(start, end).await?;
        if self.format.is_json() {
            return self.print_json(&stats);
        }
        println!("Sales {} to {}", start, end);
        println!("  Total:   {}", format_money(stats.total_sales));
        println!("  Count:   {}", stats.count);
        println!("  Average: {}", format_money(stats.average));
        Ok(())
    }

    async fn exams(&self, patient_id: &str) -> Result<()> {
        let exams = self.api.patient_exams(patient_id).await?;
        if self.format.is_json() {
            return self.print_json(&exams);
        }

        for exam in &exams {
            let date = exam.date.as_deref().map(format_date).unwrap_or_else(|| "-".to_string());
            println!("{}  {}  {} ({} files)", exam.id, date, exam.kind, exam.files.len());
            for file in &exam.files {
                let comment = file.comment.as_deref().map(|c| format!(" - {}", c)).unwrap_or_default();
                println!("    {} {}{}", file.id, file.original_name, comment);
            }
        }
        Ok(())
    }

    // ===== Upload commands =====

    async fn import(&self, args: ImportArgs) -> Result<()> {
        let file = CsvFile::load(&args.file)?;
        let report = import::import_csv(
            &self.api,
            &args.endpoint,
            &file,
            ImportOptions {
                delete_existing: args.delete_existing,
            },
        )
        .await?;

        if self.format.is_json() {
            return self.print_json(&report.raw);
        }
        println!("{}", report.summary());
        for error in &report.errors {
            println!("  ! {}", error);
        }
        Ok(())
    }

    fn template(&self, title: &str, fields: &[String], out: &Path) -> Result<()> {
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        let contents = import::template_csv(&fields).context("No columns given for the template")?;
        let path = out.join(import::template_file_name(title));
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
        Ok(())
    }

    async fn attach_exam(&self, args: AttachExamArgs) -> Result<()> {
        let target = match (args.patient, args.exam) {
            (_, Some(exam_id)) => ExamTarget::Existing { exam_id },
            (Some(patient_id), None) => ExamTarget::New { patient_id },
            (None, None) => anyhow::bail!("Either --patient or --exam is required"),
        };
        let draft = ExamDraft {
            kind: args.kind,
            date: args.date,
            result_text: args.result,
        };
        let attachments = args
            .files
            .iter()
            .map(|path| PendingAttachment::from_path(path, args.comment.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        match save_exam_with_attachments(&self.api, &target, &draft, &attachments).await {
            Ok(outcome) => {
                if self.format.is_json() {
                    return self.print_json(&json!({
                        "exam_id": outcome.exam_id,
                        "created": outcome.created,
                        "uploaded": outcome.uploaded,
                    }));
                }
                let verb = if outcome.created { "Created" } else { "Updated" };
                println!("{} exam {} with {} files.", verb, outcome.exam_id, outcome.uploaded);
                Ok(())
            }
            Err(AttachmentError::Upload { rolled_back: true, ref source, .. }) => {
                anyhow::bail!("Upload failed ({}), the new exam was discarded", source.user_message())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn download(&self, file_id: &str, out: &Path) -> Result<()> {
        let file = self.api.download_file(file_id).await?;
        let path: PathBuf = out.join(&file.file_name);
        std::fs::write(&path, &file.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {} ({} bytes)", path.display(), file.bytes.len());
        Ok(())
    }
}

/// One line of tutor list output
fn tutor_row(tutor: &Tutor) -> String {
    // Imported names may carry codes or company suffixes; only tidy plain names
    let name = tutor.display_name();
    let name = if is_valid_name(&name) {
        capitalize_words(&name)
    } else {
        name
    };

    let phone = match tutor.phone.as_deref() {
        Some(raw) => {
            let formatted = format_phone(raw);
            if is_valid_phone(&formatted) {
                formatted
            } else {
                raw.to_string()
            }
        }
        None => "-".to_string(),
    };

    let mut row = format!(
        "{:<width$} {:<16} {}",
        truncate_string(&name, NAME_COLUMN_WIDTH),
        phone,
        tutor.email.as_deref().unwrap_or("-"),
        width = NAME_COLUMN_WIDTH
    );
    if tutor.has_debt() {
        row.push_str(&format!("  debt {}", format_money(tutor.debt)));
    }
    row
}

/// One line of delivery list output
fn delivery_row(order: &DeliveryOrder) -> String {
    let assignee = match order.assigned_user_id.as_deref() {
        Some(user) if order.is_assigned() => user,
        _ => "unassigned",
    };
    let total = order
        .sale_details
        .as_ref()
        .map(|sale| format_money(sale.total))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {}  {:<12} {:<16} {:>10}",
        order.id.as_deref().unwrap_or("-"),
        format_date(&order.created_at),
        order.status,
        assignee,
        total
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tutor(json: serde_json::Value) -> Tutor {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_tutor_row_tidies_plain_names_and_phones() {
        let row = tutor_row(&tutor(serde_json::json!({
            "first_name": "juan", "last_name": "PÉREZ", "phone": "912345678", "email": "juan@example.com"
        })));
        assert!(row.starts_with("Juan Pérez"));
        assert!(row.contains("+56 9 1234 5678"));
        assert!(!row.contains("debt"));
    }

    #[test]
    fn test_tutor_row_keeps_odd_values_and_shows_debt() {
        let row = tutor_row(&tutor(serde_json::json!({
            "full_name": "AGRO SpA 2", "phone": "22 123", "debt": 15000
        })));
        assert!(row.starts_with("AGRO SpA 2"));
        assert!(row.contains("22 123"));
        assert!(row.ends_with("debt $15.000"));
    }

    #[test]
    fn test_delivery_row_marks_unassigned() {
        let order: DeliveryOrder = serde_json::from_value(serde_json::json!({
            "_id": "d1", "sale_id": "s1", "branch_id": "b1", "status": "PENDING",
            "created_at": "2026-03-01T10:00:00Z"
        }))
        .unwrap();
        let row = delivery_row(&order);
        assert!(row.starts_with("d1  01/03/2026  PENDING"));
        assert!(row.contains("unassigned"));
    }
}
