// self
use crate::_prelude::*;

/// Errors raised while parsing an expression body.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ExpressionError {
	/// The body (or one `||` alternative) was blank.
	#[error("Expression is empty.")]
	Empty,
	/// The first path segment is not a known namespace.
	#[error("Unknown namespace `{namespace}`; expected config, state, subFn, or env.")]
	UnknownNamespace {
		/// Rejected namespace segment.
		namespace: String,
	},
	/// A path contained an empty segment such as `config..issuer`.
	#[error("Path `{path}` contains an empty segment.")]
	EmptySegment {
		/// Offending path.
		path: String,
	},
	/// `env` was referenced without a variable name.
	#[error("The env namespace requires a variable name.")]
	MissingEnvName,
}

/// Scopes an expression path can address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
	/// Caller configuration.
	Config,
	/// Caller session state.
	State,
	/// Outputs of earlier chain steps.
	SubFn,
	/// Process environment variables.
	Env,
}
impl Namespace {
	/// Returns the segment that selects this namespace.
	pub const fn as_str(self) -> &'static str {
		match self {
			Namespace::Config => "config",
			Namespace::State => "state",
			Namespace::SubFn => "subFn",
			Namespace::Env => "env",
		}
	}
}
impl Display for Namespace {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Namespace {
	type Err = ExpressionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"config" => Ok(Namespace::Config),
			"state" => Ok(Namespace::State),
			"subFn" => Ok(Namespace::SubFn),
			"env" => Ok(Namespace::Env),
			other => Err(ExpressionError::UnknownNamespace { namespace: other.to_owned() }),
		}
	}
}

/// Namespace plus the segments walked inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathRef {
	/// Selected scope.
	pub namespace: Namespace,
	/// Remaining segments; empty means the whole scope.
	pub segments: Vec<String>,
}

/// One side of an `||` alternation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
	/// Scope lookup.
	Path(PathRef),
	/// Quoted literal fallback such as `'none'`.
	Literal(String),
}

/// Parsed body of a single `{{ ... }}` occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
	/// Alternatives evaluated left to right; always non-empty.
	pub alternatives: Vec<Operand>,
}
impl FromStr for Expression {
	type Err = ExpressionError;

	fn from_str(body: &str) -> Result<Self, Self::Err> {
		let alternatives = split_alternatives(body)
			.into_iter()
			.map(|alt| parse_operand(alt.trim()))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { alternatives })
	}
}

/// Splits on `||` outside single- or double-quoted literals.
fn split_alternatives(body: &str) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut quote = None;
	let mut start = 0;
	let mut chars = body.char_indices().peekable();

	while let Some((i, c)) = chars.next() {
		match (quote, c) {
			(Some(open), _) if c == open => quote = None,
			(Some(_), _) => {},
			(None, '\'' | '"') => quote = Some(c),
			(None, '|') if chars.peek().is_some_and(|(_, next)| *next == '|') => {
				chars.next();
				parts.push(&body[start..i]);
				start = i + 2;
			},
			_ => {},
		}
	}
	parts.push(&body[start..]);

	parts
}

fn parse_operand(raw: &str) -> Result<Operand, ExpressionError> {
	if raw.is_empty() {
		return Err(ExpressionError::Empty);
	}
	if let Some(literal) = quoted(raw) {
		return Ok(Operand::Literal(literal.to_owned()));
	}

	let mut parts = raw.split('.').map(str::trim);
	let namespace = parts.next().unwrap_or_default().parse::<Namespace>()?;
	let segments = parts.map(str::to_owned).collect::<Vec<_>>();

	if segments.iter().any(String::is_empty) {
		return Err(ExpressionError::EmptySegment { path: raw.to_owned() });
	}
	if namespace == Namespace::Env && segments.is_empty() {
		return Err(ExpressionError::MissingEnvName);
	}

	Ok(Operand::Path(PathRef { namespace, segments }))
}

fn quoted(raw: &str) -> Option<&str> {
	['\'', '"'].into_iter().find_map(|quote| {
		if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
			Some(&raw[1..raw.len() - 1])
		} else {
			None
		}
	})
}
