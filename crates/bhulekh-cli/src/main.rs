//! `bhulekh` — operator CLI for the property registration ledger.
//!
//! Every invocation restores the ledger through the channel priority chain
//! (SQLite backup table → IPFS via Pinata → local snapshot file), runs one
//! command against it, and — for mutating commands — broadcasts a fresh
//! backup to every configured channel before exiting.

mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use bhulekh_codec::Cipher;
use bhulekh_core::{
  Ledger,
  ledger::{NewInheritance, NewRegistration, NewTransfer},
  record::{LandDetails, Location},
};
use bhulekh_store::{
  BackupChannel, BackupMeta, CidRegistry, LocalFileChannel, Outcome,
  PinataChannel, SqliteChannel, backup_ledger, restore_ledger,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use settings::Settings;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "bhulekh", version, about = "Property registration ledger")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Register a new property.
  Register {
    property_key: String,
    owner:        String,
    address:      String,
    pincode:      String,
    /// Registered value in INR.
    value:        f64,
    aadhaar:      String,
    pan:          String,
    survey_no:    String,
    #[arg(long, default_value = "")]
    rtc_no:       String,
    #[arg(long, default_value = "")]
    village:      String,
    #[arg(long, default_value = "")]
    taluk:        String,
    #[arg(long, default_value = "")]
    district:     String,
    #[arg(long, default_value = "")]
    state:        String,
    #[arg(long, default_value = "")]
    land_area:    String,
    #[arg(long, default_value = "")]
    land_category: String,
    #[arg(long, default_value = "")]
    description:  String,
  },
  /// Transfer a property to a new owner.
  Transfer {
    property_key: String,
    new_owner:    String,
    aadhaar:      String,
    pan:          String,
    /// Consideration in INR; defaults to the current tracked value.
    #[arg(long)]
    value:        Option<f64>,
    #[arg(long, default_value = "sale")]
    reason:       String,
    /// Override the default 2 % stamp duty.
    #[arg(long)]
    stamp_duty:   Option<f64>,
    /// Override the default 5 % registration fee.
    #[arg(long)]
    registration_fee: Option<f64>,
  },
  /// Transfer a property to a legal heir.
  Inherit {
    property_key:   String,
    deceased_owner: String,
    heir:           String,
    aadhaar:        String,
    pan:            String,
    relationship:   String,
    certificate_no: String,
  },
  /// Show the current state of a property.
  Show { property_key: String },
  /// Show a property's full record history, or one record by index.
  History {
    property_key: String,
    #[arg(long)]
    index:        Option<u64>,
  },
  /// Weighted fuzzy search across all properties.
  Search { query: String },
  /// Re-verify every record hash and link in the chain.
  Validate,
  /// Save a backup to every configured channel.
  Backup,
  /// Report where the startup ledger came from.
  Restore,
  /// Ledger statistics.
  Stats,
}

impl Command {
  /// Mutating commands trigger an automatic backup afterwards.
  fn mutates(&self) -> bool {
    matches!(
      self,
      Self::Register { .. } | Self::Transfer { .. } | Self::Inherit { .. }
    )
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;
  let cipher = Cipher::new();

  let channels = build_channels(&settings)?;
  let restored = restore_ledger(&channels, &cipher)?;
  info!(
    source = restored.source,
    records = restored.ledger.records().len(),
    "ledger ready"
  );

  // Each invocation works on its own freshly restored ledger value; a
  // mutation is durable only once the post-command backup succeeds.
  let mut ledger = restored.ledger;
  let mutates = cli.command.mutates();

  match cli.command {
    Command::Register {
      property_key,
      owner,
      address,
      pincode,
      value,
      aadhaar,
      pan,
      survey_no,
      rtc_no,
      village,
      taluk,
      district,
      state,
      land_area,
      land_category,
      description,
    } => {
      let record = ledger.register_property(NewRegistration {
        property_key,
        owner,
        address,
        pincode,
        value,
        aadhaar,
        pan,
        survey_no,
        rtc_no,
        location: Location {
          village,
          taluk,
          district,
          state,
        },
        land: LandDetails {
          area:     land_area,
          category: land_category,
        },
        description,
      })?;
      print_json(&record)?;
    }
    Command::Transfer {
      property_key,
      new_owner,
      aadhaar,
      pan,
      value,
      reason,
      stamp_duty,
      registration_fee,
    } => {
      let record = ledger.transfer_property(NewTransfer {
        property_key,
        new_owner,
        aadhaar,
        pan,
        transfer_value: value,
        transfer_reason: reason,
        stamp_duty,
        registration_fee,
      })?;
      print_json(&record)?;
    }
    Command::Inherit {
      property_key,
      deceased_owner,
      heir,
      aadhaar,
      pan,
      relationship,
      certificate_no,
    } => {
      let record = ledger.inherit_property(NewInheritance {
        property_key,
        deceased_owner,
        heir,
        aadhaar,
        pan,
        relationship,
        legal_heir_certificate_no: certificate_no,
      })?;
      print_json(&record)?;
    }
    Command::Show { property_key } => {
      print_json(&ledger.current_state(&property_key)?)?;
    }
    Command::History {
      property_key,
      index,
    } => match index {
      Some(_) => print_json(&ledger.record_for(&property_key, index)?)?,
      None => print_json(&ledger.history(&property_key)?)?,
    },
    Command::Search { query } => {
      print_json(&ledger.unified_search(&query))?;
    }
    Command::Validate => {
      ledger.validate().context("chain validation failed")?;
      let stats = ledger.stats();
      println!(
        "chain valid: {} records, {} properties",
        stats.total_records, stats.total_properties
      );
    }
    Command::Backup => {
      save_backup(&ledger, &channels, &settings)?;
      println!("backup complete");
    }
    Command::Restore => {
      print_json(&RestoreReport::new(restored.source, &restored.outcome, &ledger))?;
    }
    Command::Stats => {
      print_json(&ledger.stats())?;
    }
  }

  if mutates {
    save_backup(&ledger, &channels, &settings)?;
  }

  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn build_channels(
  settings: &Settings,
) -> anyhow::Result<Vec<Box<dyn BackupChannel>>> {
  let mut channels: Vec<Box<dyn BackupChannel>> = Vec::new();

  channels.push(Box::new(
    SqliteChannel::open(settings.sqlite_path())
      .context("failed to open backup database")?,
  ));

  if settings.pinata_api_key.is_empty() {
    info!("Pinata credentials not set; remote channel disabled");
  } else {
    let registry = CidRegistry::new(&settings.data_dir);
    let channel = PinataChannel::new(
      settings.pinata_api_key.clone(),
      settings.pinata_secret_key.clone(),
      registry,
      settings.gateways.clone(),
    )
    .context("failed to construct Pinata channel")?;
    channels.push(Box::new(channel));
  }

  channels.push(Box::new(LocalFileChannel::new(&settings.data_dir)));
  Ok(channels)
}

fn save_backup(
  ledger: &Ledger,
  channels: &[Box<dyn BackupChannel>],
  settings: &Settings,
) -> anyhow::Result<()> {
  let meta = BackupMeta::auto(settings.operator.clone());
  let report = backup_ledger(ledger, channels, &meta, &Cipher::new())?;
  for (channel, error) in &report.failed {
    warn!(channel, %error, "backup channel failed");
  }
  if !report.any_succeeded() {
    bail!("every backup channel failed; the mutation is not durable");
  }
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Shape of the `restore` subcommand's report.
#[derive(Serialize)]
struct RestoreReport {
  source:       &'static str,
  outcome:      String,
  records:      usize,
  properties:   usize,
}

impl RestoreReport {
  fn new(source: &'static str, outcome: &Outcome, ledger: &Ledger) -> Self {
    let outcome = match outcome {
      Outcome::Full => "full".to_string(),
      Outcome::Partial { dropped } => format!("partial ({dropped} dropped)"),
      Outcome::Fresh => "fresh".to_string(),
    };
    Self {
      source,
      outcome,
      records: ledger.records().len(),
      properties: ledger.stats().total_properties,
    }
  }
}
