use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use devbuf_registry::{ControlCommand, DeviceRegistry, IoctlRequest};
use serde::Serialize;

use crate::cmd::InfoArgs;
use crate::exit::{registry_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct CommandInfo {
    name: &'static str,
    code: u32,
    request: String,
    magic: char,
    nr: u8,
    arg_size: u16,
}

#[derive(Serialize)]
struct InfoOutput {
    schema_id: &'static str,
    capacity: usize,
    max_minors: u32,
    minor_range: String,
    commands: Vec<CommandInfo>,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = DeviceRegistry::with_config(args.registry.config())
        .map_err(|err| registry_error("invalid registry config", &err))?;
    let config = *registry.config();

    let commands = ControlCommand::all()
        .into_iter()
        .map(|command| {
            let request = IoctlRequest::decode(command.request());
            CommandInfo {
                name: command.name(),
                code: command.code(),
                request: format!("{:#010x}", command.request()),
                magic: char::from(request.magic),
                nr: request.nr,
                arg_size: request.size,
            }
        })
        .collect();

    let out = InfoOutput {
        schema_id: "https://schemas.3leaps.dev/devbuf/cli/v1/registry-info.schema.json",
        capacity: config.capacity,
        max_minors: config.max_minors,
        minor_range: format!("0-{}", config.max_minors - 1),
        commands,
    };

    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["capacity".to_string(), out.capacity.to_string()])
                .add_row(vec!["minors".to_string(), out.minor_range.clone()]);
            for command in &out.commands {
                table.add_row(vec![
                    command.name.to_string(),
                    format!("code={} request={}", command.code, command.request),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("capacity={} minors={}", out.capacity, out.minor_range);
            for command in &out.commands {
                println!(
                    "{} code={} request={} (magic='{}' nr={} size={})",
                    command.name,
                    command.code,
                    command.request,
                    command.magic,
                    command.nr,
                    command.arg_size
                );
            }
        }
    }
}
