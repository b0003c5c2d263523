//! Template syntax - Parse fragment sources into an executable tree
//!
//! A fragment is literal text interleaved with actions:
//!
//! ```text
//! {{ persona "jaded_dev" }}
//! Explain: {{ consume_args | join " " }}
//! {{- /* trimmed comment */ -}}
//! ```
//!
//! An action is a pipeline of commands separated by `|`; the value of each
//! command becomes the last argument of the next one. Unknown identifiers are
//! rejected while parsing, so execution only ever sees known builtins.

use crate::error::{JenaiError, Result};

/// Functions every fragment can call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Git,
    Join,
    Strings,
    Persona,
    Instruction,
    Section1,
    ConsumeArgs,
}

impl Builtin {
    /// Resolve an identifier, including the short aliases
    pub fn lookup(ident: &str) -> Option<Self> {
        let builtin = match ident {
            "git" => Builtin::Git,
            "join" => Builtin::Join,
            "strings" => Builtin::Strings,
            "persona" | "per" => Builtin::Persona,
            "instruction" | "ins" => Builtin::Instruction,
            "section1" | "sec1" => Builtin::Section1,
            "consume_args" => Builtin::ConsumeArgs,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Git => "git",
            Builtin::Join => "join",
            Builtin::Strings => "strings",
            Builtin::Persona => "persona",
            Builtin::Instruction => "instruction",
            Builtin::Section1 => "section1",
            Builtin::ConsumeArgs => "consume_args",
        }
    }
}

/// A single argument position
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Str(String),
    /// The fragment's input value (`input` or `.`)
    Input,
    /// A builtin; called with no arguments unless it heads a command
    Func(Builtin),
    /// Parenthesised pipeline
    Sub(Pipeline),
}

/// One command: a function with its arguments, or a lone operand
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Action(Pipeline),
}

/// A parsed fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub nodes: Vec<Node>,
}

impl Template {
    /// Parse `source`; `name` only appears in error messages
    pub fn parse(name: &str, source: &str) -> Result<Self> {
        let mut parser = Parser { name, src: source, pos: 0 };
        let nodes = parser.parse_nodes()?;
        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }
}

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

struct Parser<'s> {
    name: &'s str,
    src: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn parse_nodes(&mut self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        let mut trim_next = false;

        loop {
            let rest = self.rest();
            let Some(offset) = rest.find(OPEN) else {
                push_text(&mut nodes, rest, trim_next, false);
                break;
            };

            let action_start = self.pos + offset;
            self.pos = action_start + OPEN.len();
            let trim_before = self.trim_marker_at_open();
            push_text(&mut nodes, &rest[..offset], trim_next, trim_before);

            self.skip_whitespace();
            if self.rest().starts_with("/*") {
                trim_next = self.skip_comment(action_start)?;
                continue;
            }

            let pipeline = self.parse_pipeline()?;
            trim_next = self.expect_close(action_start)?;
            nodes.push(Node::Action(pipeline));
        }

        Ok(nodes)
    }

    fn rest(&self) -> &'s str {
        let src: &'s str = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// `{{- ` trims the text before the action
    fn trim_marker_at_open(&mut self) -> bool {
        let mut chars = self.rest().chars();
        if chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// Consume ` -}}` or `}}`; returns whether the following text is trimmed
    fn expect_close(&mut self, action_start: usize) -> Result<bool> {
        self.skip_whitespace();
        if self.rest().starts_with("-}}") {
            self.pos += 3;
            return Ok(true);
        }
        if self.rest().starts_with(CLOSE) {
            self.pos += CLOSE.len();
            return Ok(false);
        }
        match self.peek() {
            None => Err(self.error_at(action_start, "unclosed action")),
            Some(c) => Err(self.error_at(self.pos, &format!("unexpected {:?} in action", c))),
        }
    }

    fn skip_comment(&mut self, action_start: usize) -> Result<bool> {
        let Some(end) = self.rest().find("*/") else {
            return Err(self.error_at(action_start, "unclosed comment"));
        };
        self.pos += end + 2;
        self.expect_close(action_start)
    }

    fn at_pipeline_end(&self) -> bool {
        let rest = self.rest();
        rest.is_empty() || rest.starts_with(CLOSE) || rest.starts_with("-}}") || rest.starts_with(')')
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline> {
        let mut commands = vec![self.parse_command()?];
        loop {
            self.skip_whitespace();
            if self.peek() != Some('|') {
                break;
            }
            self.pos += 1;
            commands.push(self.parse_command()?);
        }
        Ok(Pipeline { commands })
    }

    fn parse_command(&mut self) -> Result<Command> {
        let mut operands = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_pipeline_end() || self.peek() == Some('|') {
                break;
            }
            operands.push(self.parse_operand()?);
        }
        if operands.is_empty() {
            return Err(self.error_at(self.pos, "missing value for command"));
        }
        Ok(Command { operands })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let start = self.pos;
        match self.peek() {
            Some('"') => self.parse_quoted().map(Operand::Str),
            Some('`') => self.parse_raw().map(Operand::Str),
            Some('(') => {
                self.pos += 1;
                let pipeline = self.parse_pipeline()?;
                self.skip_whitespace();
                if self.peek() != Some(')') {
                    return Err(self.error_at(start, "unclosed left paren"));
                }
                self.pos += 1;
                Ok(Operand::Sub(pipeline))
            }
            Some('.') => {
                self.pos += 1;
                Ok(Operand::Input)
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let ident = self.parse_ident();
                if ident == "input" {
                    return Ok(Operand::Input);
                }
                Builtin::lookup(ident)
                    .map(Operand::Func)
                    .ok_or_else(|| self.error_at(start, &format!("function {:?} not defined", ident)))
            }
            Some(c) => Err(self.error_at(start, &format!("unexpected {:?} in command", c))),
            None => Err(self.error_at(start, "unclosed action")),
        }
    }

    fn parse_ident(&mut self) -> &'s str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, '"')) => '"',
                        Some((_, '\\')) => '\\',
                        Some((_, other)) => {
                            return Err(self.error_at(start, &format!("unknown escape sequence \\{}", other)));
                        }
                        None => break,
                    };
                    out.push(escaped);
                }
                '\n' => break,
                c => out.push(c),
            }
        }

        Err(self.error_at(start, "unterminated quoted string"))
    }

    fn parse_raw(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let Some(end) = self.rest().find('`') else {
            return Err(self.error_at(start, "unterminated raw quoted string"));
        };
        let out = self.rest()[..end].to_string();
        self.pos += end + 1;
        Ok(out)
    }

    fn error_at(&self, pos: usize, message: &str) -> JenaiError {
        let line = self.src[..pos.min(self.src.len())].matches('\n').count() + 1;
        JenaiError::Template {
            name: format!("{}:{}", self.name, line),
            message: message.to_string(),
        }
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str, trim_start: bool, trim_end: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    let text = if trim_end { text.trim_end() } else { text };
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}
