//! Fragment evaluation
//!
//! An [`EvalContext`] walks parsed templates and calls builtins. Nested
//! fragment calls (`persona`, `instruction`, `section1`) re-enter the same
//! context, so every builtin and the positional cursor are available at any
//! depth. Parsed fragments are cached per top-level evaluation.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use super::library::{Category, Library};
use super::template::{Builtin, Command, Node, Operand, Pipeline, Template};
use crate::error::{JenaiError, Result};
use crate::vcs::Vcs;

/// Runtime value flowing through pipelines
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Str(String),
    List(Vec<Value>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Str(_) => "string",
            Value::List(_) => "list",
        }
    }

    /// Strings as-is, lists space-separated, nil as nothing
    fn render_into(&self, out: &mut String) {
        match self {
            Value::Nil => {}
            Value::Str(s) => out.push_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.render_into(out);
                }
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::Str).collect())
    }
}

type FragmentKey = (Category, String);

/// Parsed-template cache plus the fragments currently being evaluated
#[derive(Debug, Default)]
struct Engine {
    templates: HashMap<FragmentKey, Rc<Template>>,
    active: Vec<FragmentKey>,
}

/// Evaluates library fragments against a positional-argument cursor
pub struct EvalContext<'a> {
    library: &'a Library,
    positional: &'a mut Vec<String>,
    vcs: &'a dyn Vcs,
    engine: Engine,
}

impl<'a> EvalContext<'a> {
    pub fn new(library: &'a Library, positional: &'a mut Vec<String>, vcs: &'a dyn Vcs) -> Self {
        Self {
            library,
            positional,
            vcs,
            engine: Engine::default(),
        }
    }

    /// Evaluate the named top-level prompt with no input
    pub fn evaluate(&mut self, prompt: &str) -> Result<String> {
        debug!("Evaluating prompt {:?}", prompt);
        self.engine = Engine::default();
        self.fragment(Category::Prompt, prompt, Value::Nil)
    }

    pub fn persona(&mut self, name: &str, args: Vec<Value>) -> Result<String> {
        self.fragment(Category::Persona, name, Value::List(args))
    }

    pub fn instruction(&mut self, name: &str, args: Vec<Value>) -> Result<String> {
        self.fragment(Category::Instruction, name, Value::List(args))
    }

    pub fn section1(&mut self, name: &str, args: Vec<Value>) -> Result<String> {
        self.fragment(Category::Section1, name, Value::List(args))
    }

    /// Take every remaining positional argument.
    ///
    /// Lets a fragment claim the leftover words so the assembler does not
    /// append them a second time.
    pub fn consume_args(&mut self) -> Result<Vec<String>> {
        if self.positional.is_empty() {
            return Err(JenaiError::NoPositionalArguments);
        }
        Ok(std::mem::take(self.positional))
    }

    fn fragment(&mut self, category: Category, name: &str, input: Value) -> Result<String> {
        let key = (category, name.to_string());
        if self.engine.active.contains(&key) {
            return Err(JenaiError::RecursiveFragment {
                category: category.as_str(),
                name: key.1,
            });
        }

        let template = self.register(category, name)?;
        self.engine.active.push(key);
        let result = self.execute(&template, &input);
        self.engine.active.pop();
        result
    }

    fn register(&mut self, category: Category, name: &str) -> Result<Rc<Template>> {
        let source = self.library.fragment(category, name)?;
        let key = (category, name.to_string());
        if let Some(template) = self.engine.templates.get(&key) {
            return Ok(Rc::clone(template));
        }

        debug!("Registering {} {:?}", category, name);
        let full = format!("{}{}", category.header(), source);
        let template = Rc::new(Template::parse(&format!("{}:{}", category, name), &full)?);
        self.engine.templates.insert(key, Rc::clone(&template));
        Ok(template)
    }

    fn execute(&mut self, template: &Template, input: &Value) -> Result<String> {
        let mut out = String::new();
        for node in &template.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => self.pipeline(template, pipeline, input)?.render_into(&mut out),
            }
        }
        Ok(out)
    }

    fn pipeline(&mut self, template: &Template, pipeline: &Pipeline, input: &Value) -> Result<Value> {
        let mut piped = None;
        for command in &pipeline.commands {
            piped = Some(self.command(template, command, input, piped.take())?);
        }
        Ok(piped.unwrap_or(Value::Nil))
    }

    fn command(&mut self, template: &Template, command: &Command, input: &Value, piped: Option<Value>) -> Result<Value> {
        match command.operands.split_first() {
            Some((Operand::Func(builtin), rest)) => {
                let mut args = rest
                    .iter()
                    .map(|operand| self.operand(template, operand, input))
                    .collect::<Result<Vec<_>>>()?;
                args.extend(piped);
                self.call(*builtin, args)
            }
            Some((operand, [])) if piped.is_none() => self.operand(template, operand, input),
            Some(_) => Err(JenaiError::Template {
                name: template.name.clone(),
                message: "can't give argument to non-function".to_string(),
            }),
            None => Ok(Value::Nil),
        }
    }

    fn operand(&mut self, template: &Template, operand: &Operand, input: &Value) -> Result<Value> {
        match operand {
            Operand::Str(s) => Ok(Value::Str(s.clone())),
            Operand::Input => Ok(input.clone()),
            Operand::Func(builtin) => self.call(*builtin, Vec::new()),
            Operand::Sub(pipeline) => self.pipeline(template, pipeline, input),
        }
    }

    fn call(&mut self, builtin: Builtin, args: Vec<Value>) -> Result<Value> {
        match builtin {
            Builtin::Git => {
                let args = flatten(&args)?;
                self.vcs.run(&args).map(Value::Str)
            }
            Builtin::Strings => flatten(&args).map(Value::from),
            Builtin::Join => join(args).map(Value::Str),
            Builtin::Persona => self.nested(builtin, Category::Persona, args),
            Builtin::Instruction => self.nested(builtin, Category::Instruction, args),
            Builtin::Section1 => self.nested(builtin, Category::Section1, args),
            Builtin::ConsumeArgs => {
                if !args.is_empty() {
                    return Err(JenaiError::Argument {
                        function: builtin.name(),
                        message: format!("wrong number of args: want 0 got {}", args.len()),
                    });
                }
                self.consume_args().map(Value::from)
            }
        }
    }

    fn nested(&mut self, builtin: Builtin, category: Category, args: Vec<Value>) -> Result<Value> {
        let mut args = args.into_iter();
        let name = match args.next() {
            Some(Value::Str(name)) => name,
            Some(other) => {
                return Err(JenaiError::Argument {
                    function: builtin.name(),
                    message: format!("fragment name must be a string, got {}", other.type_name()),
                });
            }
            None => {
                return Err(JenaiError::Argument {
                    function: builtin.name(),
                    message: "missing fragment name".to_string(),
                });
            }
        };
        self.fragment(category, &name, Value::List(args.collect())).map(Value::Str)
    }
}

/// Flatten strings and arbitrarily nested lists of strings
pub fn flatten(args: &[Value]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Str(s) => out.push(s.clone()),
            Value::List(items) => out.extend(flatten(items)?),
            Value::Nil => return Err(JenaiError::Flatten(arg.type_name())),
        }
    }
    Ok(out)
}

fn join(args: Vec<Value>) -> Result<String> {
    let [sep, elems]: [Value; 2] = args.try_into().map_err(|args: Vec<Value>| JenaiError::Argument {
        function: "join",
        message: format!("wrong number of args: want 2 got {}", args.len()),
    })?;
    match sep {
        Value::Str(sep) => Ok(flatten(std::slice::from_ref(&elems))?.join(&sep)),
        other => Err(JenaiError::Argument {
            function: "join",
            message: format!("separator must be a string, got {}", other.type_name()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every query and answers with a fixed output
    struct FakeGit {
        calls: RefCell<Vec<Vec<String>>>,
        output: Option<String>,
    }

    impl FakeGit {
        fn answering(output: &str) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                output: Some(output.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                output: None,
            }
        }
    }

    impl Vcs for FakeGit {
        fn run(&self, args: &[String]) -> Result<String> {
            self.calls.borrow_mut().push(args.to_vec());
            self.output.clone().ok_or_else(|| JenaiError::Command {
                command: format!("git {:?}", args),
                message: "exit status: 128".to_string(),
            })
        }
    }

    fn library(yaml: &str) -> Library {
        Library::from_yaml(yaml.as_bytes()).unwrap()
    }

    fn eval(lib: &Library, prompt: &str, args: &[&str]) -> (Result<String>, Vec<String>) {
        let git = FakeGit::answering("wow such diff");
        let mut positional: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let result = EvalContext::new(lib, &mut positional, &git).evaluate(prompt);
        (result, positional)
    }

    #[test]
    fn test_plain_fragment_returned_unchanged() {
        let lib = library("prompts:\n  plain: \"Nothing to see here.\\n  Really.\"\n");
        let before = lib.clone();
        let (result, positional) = eval(&lib, "plain", &["left", "over"]);
        assert_eq!(result.unwrap(), "Nothing to see here.\n  Really.");
        assert_eq!(positional, vec!["left", "over"]);
        assert_eq!(lib, before);
    }

    #[test]
    fn test_persona_with_argument() {
        let lib = library(
            r#"
prompts:
  top: '{{ persona "A" "bob" }}'
personas:
  A: "hi {{input}}"
"#,
        );
        let (result, _) = eval(&lib, "top", &[]);
        assert_eq!(result.unwrap(), "# Persona\n\nhi bob");
    }

    #[test]
    fn test_instruction_header_and_section1_without_header() {
        let lib = library(
            r#"
prompts:
  top: '{{ ins "short" }}|{{ sec1 "raw" "a" "b" }}'
instructions:
  short: "Be brief."
section1:
  raw: "args={{ . }}"
"#,
        );
        let (result, _) = eval(&lib, "top", &[]);
        assert_eq!(result.unwrap(), "# Instructions\n\nBe brief.|args=a b");
    }

    #[test]
    fn test_unknown_top_level_prompt() {
        let lib = library("prompts: {}\n");
        let (result, _) = eval(&lib, "%%!unknown_prompt", &[]);
        assert_eq!(result.unwrap_err().to_string(), "unknown prompt: %%!unknown_prompt");
    }

    #[test]
    fn test_unknown_fragment_at_depth() {
        let lib = library(
            r#"
prompts:
  top: 'x {{ section1 "outer" }}'
section1:
  outer: '{{ persona "ghost" }}'
"#,
        );
        let (result, _) = eval(&lib, "top", &[]);
        let err = result.unwrap_err();
        assert!(matches!(err, JenaiError::UnknownFragment { category: "persona", .. }));
        assert_eq!(err.to_string(), "unknown persona: ghost");
    }

    #[test]
    fn test_consume_args_claims_everything() {
        let lib = library("prompts:\n  top: '{{ consume_args | join \", \" }}'\n");
        let (result, positional) = eval(&lib, "top", &["arg1", "arg2"]);
        assert_eq!(result.unwrap(), "arg1, arg2");
        assert!(positional.is_empty());
    }

    #[test]
    fn test_consume_args_twice_fails() {
        let lib = library("prompts:\n  top: '{{ consume_args }} {{ consume_args }}'\n");
        let (result, positional) = eval(&lib, "top", &["only"]);
        assert!(matches!(result, Err(JenaiError::NoPositionalArguments)));
        assert!(positional.is_empty());
    }

    #[test]
    fn test_consume_args_direct() {
        let lib = Library::default();
        let git = FakeGit::answering("");
        let mut positional = vec!["a".to_string(), "b".to_string()];
        let mut ctx = EvalContext::new(&lib, &mut positional, &git);

        assert_eq!(ctx.consume_args().unwrap(), vec!["a", "b"]);
        assert!(matches!(ctx.consume_args(), Err(JenaiError::NoPositionalArguments)));
    }

    #[test]
    fn test_consume_args_rejects_arguments() {
        let lib = library("prompts:\n  top: '{{ consume_args \"x\" }}'\n");
        let (result, positional) = eval(&lib, "top", &["kept"]);
        assert!(matches!(result, Err(JenaiError::Argument { function: "consume_args", .. })));
        assert_eq!(positional, vec!["kept"]);
    }

    #[test]
    fn test_builtins_available_at_depth() {
        let lib = library(
            r#"
prompts:
  top: '[{{ section1 "one" }}]'
section1:
  one: '{{ section1 "two" }}'
  two: '{{ instruction "three" }}'
instructions:
  three: 'words: {{ join "+" consume_args }}'
"#,
        );
        let (result, positional) = eval(&lib, "top", &["x", "y"]);
        assert_eq!(result.unwrap(), "[# Instructions\n\nwords: x+y]");
        assert!(positional.is_empty());
    }

    #[test]
    fn test_git_receives_flattened_arguments() {
        let lib = library(
            r#"
prompts:
  top: '{{ section1 "diff" "--staged" (strings "--" (strings "a.rs" "b.rs")) }}'
section1:
  diff: '{{ git "diff" input }}'
"#,
        );
        let git = FakeGit::answering("DIFF");
        let mut positional = Vec::new();
        let result = EvalContext::new(&lib, &mut positional, &git).evaluate("top");

        assert_eq!(result.unwrap(), "DIFF");
        assert_eq!(*git.calls.borrow(), vec![vec!["diff", "--staged", "--", "a.rs", "b.rs"]]);
    }

    #[test]
    fn test_git_cannot_flatten_nil() {
        let lib = library("prompts:\n  top: '{{ git \"log\" input }}'\n");
        let git = FakeGit::answering("unused");
        let mut positional = Vec::new();
        let err = EvalContext::new(&lib, &mut positional, &git).evaluate("top").unwrap_err();

        assert_eq!(err.to_string(), "cannot flatten nil to strings");
        assert!(git.calls.borrow().is_empty());
    }

    #[test]
    fn test_git_failure_propagates() {
        let lib = library("prompts:\n  top: 'before {{ git \"diff\" }} after'\n");
        let git = FakeGit::failing();
        let mut positional = Vec::new();
        let err = EvalContext::new(&lib, &mut positional, &git).evaluate("top").unwrap_err();
        assert!(matches!(err, JenaiError::Command { .. }));
    }

    #[test]
    fn test_same_fragment_twice_is_not_recursion() {
        let lib = library(
            r#"
prompts:
  top: '{{ sec1 "say" "a" }}{{ sec1 "say" "b" }}'
section1:
  say: '<{{ input }}>'
"#,
        );
        let (result, _) = eval(&lib, "top", &[]);
        assert_eq!(result.unwrap(), "<a><b>");
    }

    #[test]
    fn test_cycle_is_detected() {
        let lib = library(
            r#"
prompts:
  top: '{{ sec1 "ping" }}'
section1:
  ping: '{{ sec1 "pong" }}'
  pong: '{{ sec1 "ping" }}'
"#,
        );
        let (result, _) = eval(&lib, "top", &[]);
        let err = result.unwrap_err();
        assert!(matches!(err, JenaiError::RecursiveFragment { category: "section1", .. }));
        assert_eq!(err.to_string(), "recursive reference to section1 \"ping\"");
    }

    #[test]
    fn test_syntax_error_in_nested_fragment() {
        let lib = library(
            r#"
prompts:
  top: '{{ persona "broken" }}'
personas:
  broken: "{{ unknown_func }}"
"#,
        );
        let (result, _) = eval(&lib, "top", &[]);
        let err = result.unwrap_err();
        assert!(matches!(err, JenaiError::Template { .. }));
        assert!(err.to_string().contains("persona:broken"));
    }

    #[test]
    fn test_join_arity() {
        let lib = library("prompts:\n  top: '{{ join \",\" }}'\n");
        let (result, _) = eval(&lib, "top", &[]);
        assert_eq!(
            result.unwrap_err().to_string(),
            "join: wrong number of args: want 2 got 1"
        );
    }

    #[test]
    fn test_pipe_into_non_function() {
        let lib = library("prompts:\n  top: '{{ \"a\" | \"b\" }}'\n");
        let (result, _) = eval(&lib, "top", &[]);
        assert!(result.unwrap_err().to_string().contains("can't give argument to non-function"));
    }

    #[test]
    fn test_fragment_name_must_be_string() {
        let lib = library("prompts:\n  top: '{{ persona (strings \"a\") }}'\n");
        let (result, _) = eval(&lib, "top", &[]);
        assert!(matches!(result, Err(JenaiError::Argument { function: "persona", .. })));
    }

    #[test]
    fn test_every_embedded_prompt_evaluates() {
        let lib = Library::embedded().unwrap();
        for name in lib.prompt_names() {
            let (result, _) = eval(&lib, name, &["French"]);
            assert!(result.is_ok(), "prompt {} failed: {:?}", name, result);
        }
    }

    #[test]
    fn test_flatten_nested() {
        let value = vec![
            Value::from("a"),
            Value::List(vec![Value::from("b"), Value::List(vec![Value::from("c")])]),
        ];
        assert_eq!(flatten(&value).unwrap(), vec!["a", "b", "c"]);
    }
}
