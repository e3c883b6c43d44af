use std::io::Read;
use std::path::Path;

use devbuf_registry::{ControlCommand, DeviceRegistry, RegistryError};

use crate::cmd::RunArgs;
use crate::exit::{io_error, registry_error, script_error, CliError, CliResult, SUCCESS};
use crate::output::{print_step, print_step_table, OutputFormat, StepRecord};
use crate::script::{command_name, parse_script, Op, Step};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let source = read_script(args.script.as_deref())?;
    let steps = parse_script(&source).map_err(script_error)?;
    let registry = DeviceRegistry::with_config(args.registry.config())
        .map_err(|err| registry_error("registry init failed", &err))?;

    let mut table_rows = Vec::new();
    let summary = execute(&registry, &steps, args.keep_going, |record| match format {
        OutputFormat::Table => table_rows.push(record),
        other => print_step(&record, other),
    });
    if matches!(format, OutputFormat::Table) {
        print_step_table(&table_rows);
    }

    let released = registry.teardown();
    tracing::debug!(
        executed = summary.executed,
        failures = summary.failures,
        released,
        "script finished"
    );

    match summary.first_failure {
        Some(err) => Err(err),
        None => Ok(SUCCESS),
    }
}

#[derive(Debug, Default)]
struct RunSummary {
    executed: usize,
    failures: usize,
    first_failure: Option<CliError>,
}

fn execute(
    registry: &DeviceRegistry,
    steps: &[Step],
    keep_going: bool,
    mut emit: impl FnMut(StepRecord),
) -> RunSummary {
    let mut summary = RunSummary::default();

    for step in steps {
        let result = apply(registry, step);
        summary.executed += 1;

        let record = match result {
            Ok(record) => record,
            Err(err) => {
                summary.failures += 1;
                if summary.first_failure.is_none() {
                    let context = format!("line {}: {} {}", step.line, step.op.name(), step.minor);
                    summary.first_failure = Some(registry_error(&context, &err));
                }
                failed_record(step, &err)
            }
        };
        emit(record);

        if summary.failures > 0 && !keep_going {
            break;
        }
    }

    summary
}

fn apply(registry: &DeviceRegistry, step: &Step) -> Result<StepRecord, RegistryError> {
    let mut record = StepRecord::new(step.line, step.op.name(), step.minor);

    match &step.op {
        Op::Open => registry.open(step.minor)?,
        Op::Close => registry.close(step.minor)?,
        Op::Write(data) => {
            record.count = Some(registry.write(step.minor, data)?);
        }
        Op::Fill { count, byte } => {
            let remaining = registry.stat(step.minor)?.remaining;
            if *count > remaining {
                return Err(RegistryError::OutOfSpace {
                    minor: step.minor,
                    requested: *count,
                    remaining,
                });
            }
            let payload = fill_payload(step.minor, *count, *byte)?;
            record.count = Some(registry.write(step.minor, &payload)?);
        }
        Op::Read(max_len) => {
            let data = registry.read_to_bytes(step.minor, *max_len)?;
            record = record.with_data(data);
        }
        Op::Reset => {
            registry.control(step.minor, ControlCommand::Reset)?;
            record.command = Some(ControlCommand::Reset.name());
        }
        Op::Restart => {
            registry.control(step.minor, ControlCommand::Restart)?;
            record.command = Some(ControlCommand::Restart.name());
        }
        Op::Control(code) => {
            registry.dispatch(step.minor, *code, 0)?;
            record.command = command_name(*code);
        }
        Op::Ioctl(request) => {
            registry.ioctl(step.minor, *request, 0)?;
            record.command = ControlCommand::from_request(*request)
                .ok()
                .map(ControlCommand::name);
        }
        Op::Stat => {
            record.stat = Some(registry.stat(step.minor)?.into());
        }
    }

    Ok(record)
}

fn fill_payload(minor: u32, count: usize, byte: u8) -> Result<Vec<u8>, RegistryError> {
    let mut payload = Vec::new();
    payload
        .try_reserve_exact(count)
        .map_err(|_| RegistryError::AllocationFailed {
            minor: Some(minor),
            size: count,
        })?;
    payload.resize(count, byte);
    Ok(payload)
}

fn failed_record(step: &Step, err: &RegistryError) -> StepRecord {
    let mut record = StepRecord::new(step.line, step.op.name(), step.minor);
    record.ok = false;
    record.error_code = Some(err.code().as_str());
    record.error = Some(err.to_string());
    record
}

fn read_script(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        _ => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(source)
        }
    }
}
