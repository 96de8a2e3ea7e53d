use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use wardlab_core::analytics::{self, DateRange};
use wardlab_core::{
    AddOnRequest, Caller, Capability, FileRequestStore, LifecycleService, ListFilter, RequestDraft,
    RequestId, RoomId, StatusFilter, WardDirectory, WardId, YamlWardDirectory,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "wardlab")]
#[command(about = "Ward & Lab add-on request CLI")]
struct Cli {
    #[command(flatten)]
    ctx: Context,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where the records live and who is acting.
#[derive(Args)]
struct Context {
    /// Directory holding the request store
    #[arg(long, global = true, env = "WARDLAB_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
    /// Ward directory YAML file
    #[arg(long, global = true, env = "WARDLAB_DIRECTORY_FILE")]
    directory_file: Option<PathBuf>,
    /// Acting user id
    #[arg(long, global = true, env = "WARDLAB_USER_ID")]
    user: Option<String>,
    /// Acting user display name
    #[arg(long, global = true, env = "WARDLAB_USER_NAME")]
    name: Option<String>,
    /// Acting user role (admin, charge_nurse, lab_staff, quality)
    #[arg(long, global = true, env = "WARDLAB_USER_ROLE")]
    role: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List add-on requests, newest first
    List {
        /// Status to show (pending, approved, rejected, completed, all)
        #[arg(long, default_value = "all")]
        status: String,
        /// Only requests from this ward
        #[arg(long)]
        ward: Option<u32>,
    },
    /// Show one request with its history
    Show {
        /// Request id
        id: String,
    },
    /// Submit a new add-on request
    Create {
        #[arg(long)]
        ward: u32,
        #[arg(long)]
        room: Option<u32>,
        #[arg(long)]
        room_number: String,
        #[arg(long)]
        patient: String,
        #[arg(long)]
        test: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        urgent: bool,
        /// Existing sample the test could be added to
        #[arg(long)]
        previous_sample: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Approve a pending request
    Approve {
        id: String,
        /// add_to_same_sample or need_new_sample
        action: String,
    },
    /// Reject a pending request
    Reject { id: String, reason: String },
    /// Mark an approved request as completed
    Complete { id: String },
    /// Aggregate statistics over an optional date range
    Stats {
        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// List wards and their rooms
    Wards,
}

impl Context {
    fn service(&self) -> CliResult<LifecycleService> {
        let store = FileRequestStore::open(&self.data_dir)?;
        let directory = match &self.directory_file {
            Some(path) => YamlWardDirectory::load(path)?,
            None => YamlWardDirectory::empty(),
        };
        Ok(LifecycleService::new(Arc::new(store), Arc::new(directory)))
    }

    /// Resolves the acting user and checks that their role grants `capability`.
    fn caller(&self, capability: Capability) -> CliResult<Caller> {
        let caller = Caller::new(
            self.user.as_deref().unwrap_or_default(),
            self.name.as_deref().unwrap_or_default(),
            self.role.as_deref().unwrap_or_default(),
        )?;
        caller.require(capability)?;
        Ok(caller)
    }
}

fn summary_line(request: &AddOnRequest) -> String {
    format!(
        "{}  {:<9}  {}  ward {} room {}  patient {}  {}{}",
        request.id(),
        request.status(),
        request.created_at().format("%Y-%m-%d %H:%M"),
        request.ward_id(),
        request.room_number(),
        request.patient_id(),
        request.requested_test(),
        if request.is_urgent() { "  [URGENT]" } else { "" },
    )
}

fn print_detail(request: &AddOnRequest, directory: &dyn WardDirectory) {
    let ward = directory
        .ward(request.ward_id())
        .map(|w| w.name)
        .unwrap_or_else(|| format!("Ward {}", request.ward_id()));
    println!("ID:       {}", request.id());
    println!("Status:   {}", request.status());
    println!("Ward:     {} (room {})", ward, request.room_number());
    println!("Patient:  {}", request.patient_id());
    println!("Test:     {}", request.requested_test());
    println!("Reason:   {}", request.reason());
    println!("Urgent:   {}", if request.is_urgent() { "yes" } else { "no" });
    if let Some(sample) = request.previous_sample_id() {
        println!("Sample:   {}", sample);
    }
    if let Some(comment) = request.additional_comment() {
        println!("Comment:  {}", comment);
    }
    if let Some(action) = request.approval_action() {
        println!("Action:   {}", action);
    }
    if let Some(reason) = request.rejection_reason() {
        println!("Rejected: {}", reason);
    }
    println!("History:");
    for entry in request.history() {
        println!(
            "  {}  {:?} by {} ({}) {}",
            entry.at.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.performed_by.name,
            entry.performed_by.role,
            entry.notes
        );
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let Some(command) = cli.command else {
        println!("Use 'wardlab --help' for commands");
        return Ok(());
    };
    let ctx = cli.ctx;
    let service = ctx.service()?;

    match command {
        Commands::List { status, ward } => {
            ctx.caller(Capability::ViewRequests)?;
            let filter = ListFilter {
                status: status.parse::<StatusFilter>()?,
                ward_id: ward.map(WardId),
            };
            let list = service.list(&filter)?;
            if list.is_empty() {
                println!("No add-on requests found.");
            }
            for request in &list {
                println!("{}", summary_line(request));
            }
        }
        Commands::Show { id } => {
            ctx.caller(Capability::ViewRequests)?;
            let request = service.get(RequestId::parse(&id)?)?;
            print_detail(&request, service.directory());
        }
        Commands::Create {
            ward,
            room,
            room_number,
            patient,
            test,
            reason,
            urgent,
            previous_sample,
            comment,
        } => {
            let caller = ctx.caller(Capability::SubmitAddon)?;
            let draft = RequestDraft {
                ward_id: Some(WardId(ward)),
                room_id: room.map(RoomId),
                room_number,
                patient_id: patient,
                requested_test: test,
                reason,
                is_urgent: urgent,
                has_previous_sample: previous_sample.is_some(),
                previous_sample_id: previous_sample,
                additional_comment: comment,
            };
            let request = service.create(&caller, draft)?;
            println!("Created add-on request {}", request.id());
        }
        Commands::Approve { id, action } => {
            let caller = ctx.caller(Capability::ReviewAddon)?;
            let request = service.approve(RequestId::parse(&id)?, &action, &caller)?;
            println!("Approved {} ({})", request.id(), action);
        }
        Commands::Reject { id, reason } => {
            let caller = ctx.caller(Capability::ReviewAddon)?;
            let request = service.reject(RequestId::parse(&id)?, &reason, &caller)?;
            println!("Rejected {}", request.id());
        }
        Commands::Complete { id } => {
            let caller = ctx.caller(Capability::ReviewAddon)?;
            let request = service.complete(RequestId::parse(&id)?, &caller)?;
            println!("Completed {}", request.id());
        }
        Commands::Stats { from, to } => {
            ctx.caller(Capability::ViewAnalytics)?;
            let range = DateRange {
                start: from.map(|d| d.and_time(NaiveTime::MIN).and_utc()),
                end: to
                    .and_then(|d| d.succ_opt())
                    .map(|d| d.and_time(NaiveTime::MIN).and_utc() - chrono::Duration::nanoseconds(1)),
            };
            let list = service.list(&ListFilter::default())?;
            let stats = analytics::addon_stats(&list, service.directory(), range);

            println!("Total requests:  {}", stats.total_requests);
            println!(
                "Preventable:     {} ({:.2}%)",
                stats.preventable_count, stats.preventable_percentage
            );
            println!(
                "Shifts:          day {} / night {}",
                stats.shift_stats.day, stats.shift_stats.night
            );
            let b = &stats.status_breakdown;
            println!(
                "Status:          pending {} / approved {} / rejected {} / completed {}",
                b.pending, b.approved, b.rejected, b.completed
            );
            for (title, counts) in [
                ("By ward", &stats.ward_stats),
                ("By test", &stats.test_stats),
                ("By reason", &stats.reason_stats),
                ("By requester", &stats.user_stats),
            ] {
                println!("{}:", title);
                for (key, count) in counts {
                    println!("  {:<30} {}", key, count);
                }
            }
            println!("Generated at {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        }
        Commands::Wards => {
            ctx.caller(Capability::ViewDirectory)?;
            let directory = service.directory();
            let wards = directory.wards();
            if wards.is_empty() {
                println!("No wards configured.");
            }
            for ward in wards {
                println!("{}: {}", ward.id, ward.name);
                for room in directory.rooms(Some(ward.id)) {
                    println!(
                        "  room {} (id {})  nurse {} x{}",
                        room.room_number, room.id, room.primary_nurse.name, room.primary_nurse.extension
                    );
                }
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const WARDS: &str = r#"wards:
  - id: 1
    name: Ward A
    rooms:
      - id: 101
        room_number: "101"
        primary_nurse: { name: Sam, extension: "4411" }
"#;

    fn setup() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let directory_file = temp.path().join("wards.yaml");
        fs::write(&directory_file, WARDS).unwrap();
        (temp, directory_file)
    }

    fn run_as(temp: &TempDir, directory_file: &PathBuf, role: &str, args: &[&str]) -> CliResult<()> {
        let data_dir = temp.path().to_string_lossy().into_owned();
        let directory_file = directory_file.to_string_lossy().into_owned();
        let mut argv = vec![
            "wardlab",
            "--data-dir",
            &data_dir,
            "--directory-file",
            &directory_file,
            "--user",
            "u-1",
            "--name",
            "Test User",
            "--role",
            role,
        ];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv)?)
    }

    fn only_request(temp: &TempDir) -> AddOnRequest {
        let store = FileRequestStore::open(temp.path()).unwrap();
        let service = LifecycleService::new(Arc::new(store), Arc::new(YamlWardDirectory::empty()));
        let list = service.list(&ListFilter::default()).unwrap();
        assert_eq!(list.len(), 1);
        list.as_slice()[0].clone()
    }

    #[test]
    fn create_and_approve_through_the_cli() {
        let (temp, wards) = setup();
        run_as(
            &temp,
            &wards,
            "charge_nurse",
            &[
                "create", "--ward", "1", "--room", "101", "--room-number", "101", "--patient",
                "P1", "--test", "CBC", "--reason", "missing test",
            ],
        )
        .unwrap();

        let id = only_request(&temp).id().to_string();
        run_as(&temp, &wards, "lab_staff", &["approve", &id, "need_new_sample"]).unwrap();
        assert_eq!(
            only_request(&temp).status(),
            wardlab_core::RequestStatus::Approved
        );

        run_as(&temp, &wards, "quality", &["stats"]).unwrap();
        run_as(&temp, &wards, "quality", &["list", "--status", "approved"]).unwrap();
    }

    #[test]
    fn role_without_capability_is_refused() {
        let (temp, wards) = setup();
        let err = run_as(
            &temp,
            &wards,
            "lab_staff",
            &[
                "create", "--ward", "1", "--room-number", "101", "--patient", "P1", "--test",
                "CBC", "--reason", "stat",
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("lab_staff"), "{err}");
    }

    #[test]
    fn list_rejects_unknown_status() {
        let (temp, wards) = setup();
        assert!(run_as(&temp, &wards, "quality", &["list", "--status", "open"]).is_err());
    }
}
