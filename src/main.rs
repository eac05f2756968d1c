//! testdoc CLI - Document test evidence per project and environment.

use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use testdoc::action_log;
use testdoc::cli::{
    Cli, Commands, ConfigCommands, DataCommands, EnvCommands, ExportCommands, LogoCommands,
    ProjectCommands, SettingsCommands, SystemCommands, TestCommands,
};
use testdoc::commands::{self, Output};
use testdoc::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use testdoc::export::ArchiveFormat;
use testdoc::logging;
use testdoc::storage::resolve_data_dir;

fn main() {
    let cli = Cli::parse();
    let human_flag = cli.human_readable;

    let data_dir = match resolve_data_dir(cli.data_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) => fail(&e, human_flag),
    };

    let mut overrides = ConfigOverrides::new();
    if human_flag {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let config = match resolve_config(&data_dir, &overrides) {
        Ok(config) => config,
        Err(e) => fail(&e, human_flag),
    };
    let human = config.output_format() == OutputFormat::Human;

    let _log_guard = logging::init(config.log_dir());

    let (cmd_name, args_json) = serialize_command(&cli.command);
    let start = Instant::now();

    let result = run_command(cli.command, &data_dir, &config, &overrides, human);

    let duration = start.elapsed().as_millis() as u64;
    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    action_log::log_action(&data_dir, &cmd_name, args_json, success, error, duration);

    if let Err(e) = result {
        tracing::debug!(command = %cmd_name, error = %e, "command failed");
        fail(&e, human);
    }
}

fn fail(error: &testdoc::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", json!({ "error": error.to_string() }));
    }
    process::exit(1);
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn out_dir(explicit: Option<PathBuf>, config: &ResolvedConfig) -> PathBuf {
    explicit.unwrap_or_else(|| config.export_dir().to_path_buf())
}

fn run_command(
    command: Commands,
    data_dir: &Path,
    config: &ResolvedConfig,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<(), testdoc::Error> {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => output(&commands::system_init(data_dir)?, human),
            SystemCommands::Info => output(&commands::system_info(data_dir)?, human),
        },

        Commands::Project { command } => match command {
            ProjectCommands::Create { name } => {
                output(&commands::project::project_create(data_dir, &name)?, human)
            }
            ProjectCommands::List => output(&commands::project::project_list(data_dir)?, human),
            ProjectCommands::Show { project } => {
                output(&commands::project::project_show(data_dir, &project)?, human)
            }
            ProjectCommands::Delete { project } => {
                output(&commands::project::project_delete(data_dir, &project)?, human)
            }
        },

        Commands::Env { command } => match command {
            EnvCommands::Add { project, name } => {
                output(&commands::project::env_add(data_dir, &project, &name)?, human)
            }
            EnvCommands::List { project } => {
                output(&commands::project::env_list(data_dir, &project)?, human)
            }
        },

        Commands::Data { command } => match command {
            DataCommands::Set {
                project,
                env,
                key,
                value,
            } => output(
                &commands::project::data_set(data_dir, &project, &env, &key, &value)?,
                human,
            ),
            DataCommands::Unset { project, env, key } => output(
                &commands::project::data_unset(data_dir, &project, &env, &key)?,
                human,
            ),
            DataCommands::List { project, env } => {
                output(&commands::project::data_list(data_dir, &project, &env)?, human)
            }
        },

        Commands::Test { command } => match command {
            TestCommands::Create {
                project,
                name,
                fields,
            } => output(
                &commands::test::test_create(data_dir, &project, &name, &fields)?,
                human,
            ),
            TestCommands::Edit {
                project,
                test,
                name,
                fields,
            } => output(
                &commands::test::test_edit(data_dir, &project, &test, name.as_deref(), &fields)?,
                human,
            ),
            TestCommands::Show { project, test } => {
                output(&commands::test::test_show(data_dir, &project, &test)?, human)
            }
            TestCommands::List { project, state } => {
                output(&commands::test::test_list(data_dir, &project, state)?, human)
            }
            TestCommands::Delete { project, test } => {
                output(&commands::test::test_delete(data_dir, &project, &test)?, human)
            }
            TestCommands::Status {
                project,
                test,
                state,
                reason,
            } => output(
                &commands::test::test_status(data_dir, &project, &test, state, reason.as_deref())?,
                human,
            ),
            TestCommands::Params {
                project,
                test,
                env,
                query,
            } => output(
                &commands::test::test_params(
                    data_dir,
                    &project,
                    test.as_deref(),
                    env.as_deref(),
                    &query,
                )?,
                human,
            ),
            TestCommands::InsertParam { project, test, key } => output(
                &commands::test::test_insert_param(data_dir, &project, &test, &key)?,
                human,
            ),
            TestCommands::SyncTags { project, test } => output(
                &commands::test::test_sync_tags(data_dir, &project, test.as_deref())?,
                human,
            ),
        },

        Commands::Settings { command } => match command {
            SettingsCommands::Show => output(&commands::settings_show(data_dir)?, human),
            SettingsCommands::Logo { command } => match command {
                LogoCommands::Set { path } => {
                    output(&commands::settings_logo_set(data_dir, &path)?, human)
                }
                LogoCommands::Clear => output(&commands::settings_logo_clear(data_dir)?, human),
            },
        },

        Commands::Export { command } => match command {
            ExportCommands::Test {
                project,
                test,
                output: dir,
                format,
            } => output(
                &commands::export::export_test(
                    data_dir,
                    &project,
                    &test,
                    &format,
                    &out_dir(dir, config),
                )?,
                human,
            ),
            ExportCommands::Project {
                project,
                output: dir,
                format,
                archive,
            } => {
                let archive = match archive {
                    Some(raw) => ArchiveFormat::parse(&raw).ok_or_else(|| {
                        testdoc::Error::InvalidInput(format!(
                            "Unknown archive format '{}' (zip, tar-gz or tar-zst)",
                            raw
                        ))
                    })?,
                    None => config.archive_format(),
                };
                output(
                    &commands::export::export_project(
                        data_dir,
                        &project,
                        &format,
                        archive,
                        &out_dir(dir, config),
                    )?,
                    human,
                )
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => output(&commands::config_get(data_dir, &key)?, human),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(data_dir, &key, &value)?, human)
            }
            ConfigCommands::List => output(&commands::config_list(data_dir)?, human),
            ConfigCommands::Show => output(&commands::config_show(data_dir, overrides)?, human),
            ConfigCommands::Pref { key, value, system } => output(
                &commands::config_pref(data_dir, &key, &value, system)?,
                human,
            ),
        },
    }

    Ok(())
}

/// Command name and arguments for the action log.
fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => ("system init".to_string(), json!({})),
            SystemCommands::Info => ("system info".to_string(), json!({})),
        },

        Commands::Project { command } => match command {
            ProjectCommands::Create { name } => {
                ("project create".to_string(), json!({ "name": name }))
            }
            ProjectCommands::List => ("project list".to_string(), json!({})),
            ProjectCommands::Show { project } => {
                ("project show".to_string(), json!({ "project": project }))
            }
            ProjectCommands::Delete { project } => {
                ("project delete".to_string(), json!({ "project": project }))
            }
        },

        Commands::Env { command } => match command {
            EnvCommands::Add { project, name } => (
                "env add".to_string(),
                json!({ "project": project, "name": name }),
            ),
            EnvCommands::List { project } => {
                ("env list".to_string(), json!({ "project": project }))
            }
        },

        Commands::Data { command } => match command {
            DataCommands::Set {
                project,
                env,
                key,
                value,
            } => (
                "data set".to_string(),
                json!({ "project": project, "env": env, "key": key, "value": value }),
            ),
            DataCommands::Unset { project, env, key } => (
                "data unset".to_string(),
                json!({ "project": project, "env": env, "key": key }),
            ),
            DataCommands::List { project, env } => (
                "data list".to_string(),
                json!({ "project": project, "env": env }),
            ),
        },

        Commands::Test { command } => match command {
            TestCommands::Create {
                project,
                name,
                fields,
            } => (
                "test create".to_string(),
                json!({
                    "project": project,
                    "name": name,
                    "env": fields.env,
                    "state": fields.state.map(|s| s.to_string()),
                    "fields": fields.fields,
                    "related": fields.related,
                    "description_file": fields.description_file,
                }),
            ),
            TestCommands::Edit {
                project,
                test,
                name,
                fields,
            } => (
                "test edit".to_string(),
                json!({
                    "project": project,
                    "test": test,
                    "name": name,
                    "env": fields.env,
                    "state": fields.state.map(|s| s.to_string()),
                    "fields": fields.fields,
                    "related": fields.related,
                    "description_file": fields.description_file,
                }),
            ),
            TestCommands::Show { project, test } => (
                "test show".to_string(),
                json!({ "project": project, "test": test }),
            ),
            TestCommands::List { project, state } => (
                "test list".to_string(),
                json!({ "project": project, "state": state.map(|s| s.to_string()) }),
            ),
            TestCommands::Delete { project, test } => (
                "test delete".to_string(),
                json!({ "project": project, "test": test }),
            ),
            TestCommands::Status {
                project,
                test,
                state,
                reason,
            } => (
                "test status".to_string(),
                json!({ "project": project, "test": test, "state": state.to_string(), "reason": reason }),
            ),
            TestCommands::Params {
                project,
                test,
                env,
                query,
            } => (
                "test params".to_string(),
                json!({ "project": project, "test": test, "env": env, "query": query }),
            ),
            TestCommands::InsertParam { project, test, key } => (
                "test insert-param".to_string(),
                json!({ "project": project, "test": test, "param": key }),
            ),
            TestCommands::SyncTags { project, test } => (
                "test sync-tags".to_string(),
                json!({ "project": project, "test": test }),
            ),
        },

        Commands::Settings { command } => match command {
            SettingsCommands::Show => ("settings show".to_string(), json!({})),
            SettingsCommands::Logo { command } => match command {
                LogoCommands::Set { path } => {
                    ("settings logo set".to_string(), json!({ "path": path }))
                }
                LogoCommands::Clear => ("settings logo clear".to_string(), json!({})),
            },
        },

        Commands::Export { command } => match command {
            ExportCommands::Test {
                project,
                test,
                output,
                format,
            } => (
                "export test".to_string(),
                json!({ "project": project, "test": test, "output": output, "format": format }),
            ),
            ExportCommands::Project {
                project,
                output,
                format,
                archive,
            } => (
                "export project".to_string(),
                json!({ "project": project, "output": output, "format": format, "archive": archive }),
            ),
        },

        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => ("config get".to_string(), json!({ "config_key": key })),
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                json!({ "config_key": key, "config_value": value }),
            ),
            ConfigCommands::List => ("config list".to_string(), json!({})),
            ConfigCommands::Show => ("config show".to_string(), json!({})),
            ConfigCommands::Pref { key, value, system } => (
                "config pref".to_string(),
                json!({ "pref": key, "value": value, "system": system }),
            ),
        },
    }
}
