//! Operation scripts for `devbuf run`.
//!
//! One operation per line, `#` starts a comment:
//! ```text
//! open 3
//! write 3 HELLO
//! write-hex 3 00ff10
//! fill 3 4090 0x61
//! read 3 5
//! ioctl 3 restart
//! control 3 0
//! stat 3
//! ```

use devbuf_registry::{ControlCommand, RESET_REQUEST, RESTART_REQUEST};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: unknown operation '{op}'")]
    UnknownOp { line: usize, op: String },

    #[error("line {line}: missing {what}")]
    Missing { line: usize, what: &'static str },

    #[error("line {line}: invalid {what} '{value}'")]
    Invalid {
        line: usize,
        what: &'static str,
        value: String,
    },

    #[error("line {line}: unexpected trailing input '{rest}'")]
    Trailing { line: usize, rest: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Open,
    Close,
    Write(Vec<u8>),
    Fill { count: usize, byte: u8 },
    Read(usize),
    Reset,
    Restart,
    Control(u32),
    Ioctl(u32),
    Stat,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Open => "open",
            Op::Close => "close",
            Op::Write(_) => "write",
            Op::Fill { .. } => "fill",
            Op::Read(_) => "read",
            Op::Reset => "reset",
            Op::Restart => "restart",
            Op::Control(_) => "control",
            Op::Ioctl(_) => "ioctl",
            Op::Stat => "stat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub line: usize,
    pub minor: u32,
    pub op: Op,
}

pub fn parse_script(source: &str) -> Result<Vec<Step>, ScriptError> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, text)| {
            let text = strip_comment(text).trim();
            (!text.is_empty()).then_some((idx + 1, text))
        })
        .map(|(line, text)| parse_line(line, text))
        .collect()
}

fn strip_comment(text: &str) -> &str {
    // `write` payloads are taken verbatim.
    if split_word(text).0 == "write" {
        return text;
    }
    match text.find('#') {
        Some(pos) => &text[..pos],
        None => text,
    }
}

fn parse_line(line: usize, text: &str) -> Result<Step, ScriptError> {
    let (op, rest) = split_word(text);
    let (minor, rest) = split_word(rest);
    let minor = parse_number::<u32>(line, "minor", minor)?;

    let op = match op {
        "open" => Op::Open,
        "close" | "release" => Op::Close,
        "reset" => Op::Reset,
        "restart" => Op::Restart,
        "stat" => Op::Stat,
        // Everything after the minor is payload, spaces included.
        "write" => {
            if rest.is_empty() {
                return Err(ScriptError::Missing {
                    line,
                    what: "payload",
                });
            }
            return Ok(Step {
                line,
                minor,
                op: Op::Write(rest.as_bytes().to_vec()),
            });
        }
        "write-hex" => {
            let (payload, tail) = split_word(rest);
            expect_end(line, tail)?;
            let bytes = hex::decode(payload).map_err(|_| ScriptError::Invalid {
                line,
                what: "hex payload",
                value: payload.to_string(),
            })?;
            Op::Write(bytes)
        }
        "fill" => {
            let (count, tail) = split_word(rest);
            let (byte, tail) = split_word(tail);
            expect_end(line, tail)?;
            // Materialized at run time, once the slot's remaining space is known.
            Op::Fill {
                count: parse_number::<usize>(line, "count", count)?,
                byte: parse_number::<u8>(line, "byte", byte)?,
            }
        }
        "read" => {
            let (count, tail) = split_word(rest);
            expect_end(line, tail)?;
            Op::Read(parse_number::<usize>(line, "count", count)?)
        }
        "control" => {
            let (code, tail) = split_word(rest);
            expect_end(line, tail)?;
            Op::Control(parse_number::<u32>(line, "command code", code)?)
        }
        "ioctl" => {
            let (request, tail) = split_word(rest);
            expect_end(line, tail)?;
            Op::Ioctl(parse_request(line, request)?)
        }
        other => {
            return Err(ScriptError::UnknownOp {
                line,
                op: other.to_string(),
            })
        }
    };

    if let Op::Open | Op::Close | Op::Reset | Op::Restart | Op::Stat = op {
        expect_end(line, rest)?;
    }

    Ok(Step { line, minor, op })
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim_start()),
        None => (text, ""),
    }
}

fn expect_end(line: usize, rest: &str) -> Result<(), ScriptError> {
    if rest.trim().is_empty() {
        Ok(())
    } else {
        Err(ScriptError::Trailing {
            line,
            rest: rest.trim().to_string(),
        })
    }
}

fn parse_request(line: usize, value: &str) -> Result<u32, ScriptError> {
    match value {
        "reset" => Ok(RESET_REQUEST),
        "restart" => Ok(RESTART_REQUEST),
        other => parse_number::<u32>(line, "ioctl request", other),
    }
}

fn parse_number<T>(line: usize, what: &'static str, value: &str) -> Result<T, ScriptError>
where
    T: TryFrom<u64>,
{
    if value.is_empty() {
        return Err(ScriptError::Missing { line, what });
    }

    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex_digits) => u64::from_str_radix(hex_digits, 16).ok(),
        None => value.parse::<u64>().ok(),
    };

    parsed
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ScriptError::Invalid {
            line,
            what,
            value: value.to_string(),
        })
}

/// Command named by a raw code, if any.
pub fn command_name(code: u32) -> Option<&'static str> {
    ControlCommand::from_code(code).ok().map(ControlCommand::name)
}
