//! Part 21 (STEP physical file) reader.
//!
//! Splits the exchange structure into statements, then decodes each DATA
//! record into a modeled [`Entity`] when its keyword and argument shape are
//! understood, or keeps it as a [`RawEntity`] otherwise. Raw records keep
//! their argument text verbatim so unknown constructs survive a merge.

use super::entity::{
    Curve, Direction, Edge, EdgeLoop, Entity, Face, FaceBound, OrientedEdge, Placement, Point,
    RawEntity, Ref, Shell, Solid, Surface, Vector, Vertex,
};
use super::error::{StepError, StepResult};
use super::repository::Repository;

const MAGIC: &str = "ISO-10303-21";
const TRAILER: &str = "END-ISO-10303-21";

/// A `;`-terminated statement and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statement {
    line: usize,
    text: String,
}

/// Parses STEP text into a standalone repository.
///
/// Entity ids are kept exactly as written in the file.
///
/// # Errors
///
/// Returns an error if the text is not an ISO-10303-21 file, a DATA
/// statement is malformed, an id repeats, or no entities are present.
pub fn parse_step(text: &str) -> StepResult<Repository> {
    if !starts_with_magic(text) {
        return Err(StepError::not_step(format!("missing '{MAGIC};'")));
    }
    let statements = split_statements(text)?;
    let mut iter = statements.into_iter();

    match iter.next() {
        Some(first) if first.text == MAGIC => {}
        Some(_) | None => return Err(StepError::not_step(format!("missing '{MAGIC};'"))),
    }

    let mut repo = Repository::new();
    let mut saw_data = false;

    while let Some(statement) = iter.next() {
        let keyword = section_keyword(&statement.text);
        match keyword {
            "HEADER" => skip_section(&mut iter, statement.line)?,
            "DATA" => {
                saw_data = true;
                read_data_section(&mut iter, &mut repo, statement.line)?;
            }
            TRAILER => break,
            _ => {
                return Err(StepError::syntax(
                    statement.line,
                    format!("unexpected statement outside a section: {}", preview(&statement.text)),
                ));
            }
        }
    }

    if !saw_data {
        return Err(StepError::not_step("missing DATA section"));
    }
    if repo.is_empty() {
        return Err(StepError::Empty);
    }
    Ok(repo)
}

/// Checks the magic token ahead of any statement splitting, skipping
/// whitespace and comments, so foreign text fails as `NotStep`.
fn starts_with_magic(text: &str) -> bool {
    let mut rest = text.trim_start();
    while let Some(comment) = rest.strip_prefix("/*") {
        let Some(end) = comment.find("*/") else {
            return false;
        };
        rest = comment[end + 2..].trim_start();
    }
    rest.starts_with(MAGIC)
}

/// Section keywords may carry parameters, e.g. `DATA('name',(...))`.
fn section_keyword(text: &str) -> &str {
    text.split('(').next().unwrap_or(text).trim()
}

fn skip_section(iter: &mut impl Iterator<Item = Statement>, line: usize) -> StepResult<()> {
    for statement in iter.by_ref() {
        if statement.text == "ENDSEC" {
            return Ok(());
        }
    }
    Err(StepError::syntax(line, "section is missing ENDSEC"))
}

fn read_data_section(
    iter: &mut impl Iterator<Item = Statement>,
    repo: &mut Repository,
    line: usize,
) -> StepResult<()> {
    for statement in iter.by_ref() {
        if statement.text == "ENDSEC" {
            return Ok(());
        }
        let (id, entity) = parse_record(&statement)?;
        repo.place_at(id, entity).map_err(|e| match e {
            StepError::OccupiedId(id) => {
                StepError::syntax(statement.line, format!("duplicate entity id #{id}"))
            }
            other => other,
        })?;
    }
    Err(StepError::syntax(line, "DATA section is missing ENDSEC"))
}

/// Parses `#<id> = BODY` into an entity.
fn parse_record(statement: &Statement) -> StepResult<(u64, Entity)> {
    let line = statement.line;
    let text = statement.text.as_str();

    let rest = text
        .strip_prefix('#')
        .ok_or_else(|| StepError::syntax(line, format!("expected '#<id> =': {}", preview(text))))?;
    let (id_text, body) = rest
        .split_once('=')
        .ok_or_else(|| StepError::syntax(line, "missing '=' after entity id"))?;
    let id: u64 = id_text
        .trim()
        .parse()
        .map_err(|_| StepError::syntax(line, format!("invalid entity id '#{}'", id_text.trim())))?;
    if id == 0 {
        return Err(StepError::syntax(line, "entity id #0 is not allowed"));
    }

    let body = body.trim();
    if !body.ends_with(')') || !parens_balanced(body) {
        return Err(StepError::syntax(
            line,
            format!("unbalanced parentheses in #{id}"),
        ));
    }

    if let Some(inner) = body.strip_prefix('(') {
        let inner = &inner[..inner.len() - 1];
        return Ok((id, Entity::Raw(RawEntity::complex(inner.trim()))));
    }

    let open = body
        .find('(')
        .ok_or_else(|| StepError::syntax(line, format!("missing argument list in #{id}")))?;
    let keyword = body[..open].trim().to_ascii_uppercase();
    if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StepError::syntax(line, format!("invalid keyword in #{id}")));
    }
    let args = &body[open + 1..body.len() - 1];

    let entity = decode(&keyword, args, line)?
        .unwrap_or_else(|| Entity::Raw(RawEntity::simple(keyword, args.trim())));
    Ok((id, entity))
}

fn parens_balanced(text: &str) -> bool {
    let mut depth = 0i64;
    let mut in_string = false;
    for ch in text.chars() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !in_string
}

fn preview(text: &str) -> String {
    const MAX: usize = 40;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}...")
    }
}

/// Splits Part 21 text into statements on `;`, skipping comments and
/// honouring quoted strings.
fn split_statements(text: &str) -> StepResult<Vec<Statement>> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start_line = 1usize;
    let mut line = 1usize;
    let mut in_string = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\n' {
            line += 1;
        }
        if in_string {
            current.push(ch);
            if ch == '\'' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '\'' => {
                in_string = true;
                current.push(ch);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut closed = false;
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    if prev == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    prev = c;
                }
                if !closed {
                    return Err(StepError::syntax(line, "unterminated comment"));
                }
            }
            ';' => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    statements.push(Statement {
                        line: start_line,
                        text: trimmed.to_string(),
                    });
                }
                current.clear();
            }
            _ => {
                if current.trim().is_empty() && !ch.is_whitespace() {
                    start_line = line;
                }
                current.push(ch);
            }
        }
    }

    if in_string {
        return Err(StepError::syntax(start_line, "unterminated string"));
    }
    if !current.trim().is_empty() {
        return Err(StepError::syntax(start_line, "statement is missing ';'"));
    }
    Ok(statements)
}

/// A decoded argument value.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Ref(u64),
    Real(f64),
    Integer(i64),
    Str(String),
    Enum(String),
    List(Vec<Value>),
    /// Inline typed parameter such as `LENGTH_MEASURE(1.E-06)`.
    Typed,
    Null,
    Derived,
}

impl Value {
    const fn as_ref_id(&self) -> Option<u64> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Enum(e) if e == "T" || e == "TRUE" => Some(true),
            Self::Enum(e) if e == "F" || e == "FALSE" => Some(false),
            _ => None,
        }
    }

    fn as_label(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Null => Some(""),
            _ => None,
        }
    }

    fn as_ref_list(&self) -> Option<Vec<u64>> {
        match self {
            Self::List(items) => items.iter().map(Self::as_ref_id).collect(),
            _ => None,
        }
    }

    fn as_triple(&self) -> Option<[f64; 3]> {
        match self {
            Self::List(items) if items.len() == 3 => Some([
                items[0].as_number()?,
                items[1].as_number()?,
                items[2].as_number()?,
            ]),
            _ => None,
        }
    }
}

/// Decodes a modeled keyword. `Ok(None)` keeps the record raw.
fn decode(keyword: &str, args: &str, line: usize) -> StepResult<Option<Entity>> {
    if !is_modeled(keyword) {
        return Ok(None);
    }
    let values = ArgLexer::new(args, line).parse_all()?;
    Ok(decode_values(keyword, &values))
}

fn is_modeled(keyword: &str) -> bool {
    matches!(
        keyword,
        "CARTESIAN_POINT"
            | "DIRECTION"
            | "VECTOR"
            | "AXIS2_PLACEMENT_3D"
            | "LINE"
            | "CIRCLE"
            | "PLANE"
            | "CYLINDRICAL_SURFACE"
            | "VERTEX_POINT"
            | "EDGE_CURVE"
            | "ORIENTED_EDGE"
            | "EDGE_LOOP"
            | "FACE_OUTER_BOUND"
            | "FACE_BOUND"
            | "ADVANCED_FACE"
            | "CLOSED_SHELL"
            | "MANIFOLD_SOLID_BREP"
    )
}

fn optional_ref<T>(value: &Value) -> Option<Option<Ref<T>>> {
    match value {
        Value::Null => Some(None),
        Value::Ref(id) => Some(Some(Ref::new(*id))),
        _ => None,
    }
}

fn decode_values(keyword: &str, values: &[Value]) -> Option<Entity> {
    let entity = match (keyword, values) {
        ("CARTESIAN_POINT", [name, coords]) => {
            name.as_label()?;
            let [x, y, z] = coords.as_triple()?;
            Entity::Point(Point { x, y, z })
        }
        ("DIRECTION", [name, ratios]) => {
            name.as_label()?;
            let [dx, dy, dz] = ratios.as_triple()?;
            Entity::Direction(Direction { dx, dy, dz })
        }
        ("VECTOR", [name, orientation, magnitude]) => {
            name.as_label()?;
            Entity::Vector(Vector {
                orientation: Ref::new(orientation.as_ref_id()?),
                magnitude: magnitude.as_number()?,
            })
        }
        ("AXIS2_PLACEMENT_3D", [name, location, axis, ref_direction]) => {
            name.as_label()?;
            Entity::Placement(Placement {
                location: Ref::new(location.as_ref_id()?),
                axis: optional_ref(axis)?,
                ref_direction: optional_ref(ref_direction)?,
            })
        }
        ("LINE", [name, point, vector]) => {
            name.as_label()?;
            Entity::Curve(Curve::Line {
                point: Ref::new(point.as_ref_id()?),
                vector: Ref::new(vector.as_ref_id()?),
            })
        }
        ("CIRCLE", [name, placement, radius]) => {
            name.as_label()?;
            Entity::Curve(Curve::Circle {
                placement: Ref::new(placement.as_ref_id()?),
                radius: radius.as_number()?,
            })
        }
        ("PLANE", [name, placement]) => {
            name.as_label()?;
            Entity::Surface(Surface::Plane {
                placement: Ref::new(placement.as_ref_id()?),
            })
        }
        ("CYLINDRICAL_SURFACE", [name, placement, radius]) => {
            name.as_label()?;
            Entity::Surface(Surface::Cylinder {
                placement: Ref::new(placement.as_ref_id()?),
                radius: radius.as_number()?,
            })
        }
        ("VERTEX_POINT", [name, point]) => {
            name.as_label()?;
            Entity::Vertex(Vertex {
                point: Ref::new(point.as_ref_id()?),
            })
        }
        ("EDGE_CURVE", [name, start, end, curve, same_sense]) => {
            name.as_label()?;
            Entity::Edge(Edge {
                start: Ref::new(start.as_ref_id()?),
                end: Ref::new(end.as_ref_id()?),
                curve: Ref::new(curve.as_ref_id()?),
                same_sense: same_sense.as_bool()?,
            })
        }
        ("ORIENTED_EDGE", [name, Value::Derived, Value::Derived, edge, forward]) => {
            name.as_label()?;
            Entity::OrientedEdge(OrientedEdge {
                edge: Ref::new(edge.as_ref_id()?),
                forward: forward.as_bool()?,
            })
        }
        ("EDGE_LOOP", [name, edges]) => {
            name.as_label()?;
            Entity::EdgeLoop(EdgeLoop {
                edges: edges.as_ref_list()?.into_iter().map(Ref::new).collect(),
            })
        }
        ("FACE_OUTER_BOUND" | "FACE_BOUND", [name, edge_loop, same_sense]) => {
            name.as_label()?;
            Entity::FaceBound(FaceBound {
                edge_loop: Ref::new(edge_loop.as_ref_id()?),
                outer: keyword == "FACE_OUTER_BOUND",
                same_sense: same_sense.as_bool()?,
            })
        }
        ("ADVANCED_FACE", [name, bounds, surface, same_sense]) => {
            name.as_label()?;
            Entity::Face(Face {
                surface: Ref::new(surface.as_ref_id()?),
                bounds: bounds.as_ref_list()?.into_iter().map(Ref::new).collect(),
                same_sense: same_sense.as_bool()?,
            })
        }
        ("CLOSED_SHELL", [name, faces]) => {
            name.as_label()?;
            Entity::Shell(Shell {
                faces: faces.as_ref_list()?.into_iter().map(Ref::new).collect(),
            })
        }
        ("MANIFOLD_SOLID_BREP", [name, shell]) => Entity::Solid(Solid {
            name: name.as_label()?.to_string(),
            shell: Ref::new(shell.as_ref_id()?),
        }),
        _ => return None,
    };
    Some(entity)
}

/// Tokenizer and value parser for one argument list.
struct ArgLexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> ArgLexer<'a> {
    const fn new(input: &'a str, line: usize) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line,
        }
    }

    fn error(&self, message: impl Into<String>) -> StepError {
        StepError::syntax(self.line, message)
    }

    fn parse_all(&mut self) -> StepResult<Vec<Value>> {
        let mut values = Vec::new();
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Ok(values);
        }
        loop {
            values.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                None => return Ok(values),
                Some(c) => {
                    return Err(self.error(format!("unexpected '{}' in arguments", c as char)));
                }
            }
        }
    }

    fn parse_list(&mut self) -> StepResult<Vec<Value>> {
        // Opening parenthesis already consumed.
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(b',') => {}
                Some(b')') => return Ok(items),
                _ => return Err(self.error("unterminated list")),
            }
        }
    }

    fn parse_value(&mut self) -> StepResult<Value> {
        self.skip_whitespace();
        let Some(ch) = self.peek() else {
            return Err(self.error("expected a value"));
        };
        match ch {
            b'#' => {
                self.pos += 1;
                let digits = self.take_while(|c| c.is_ascii_digit());
                digits
                    .parse()
                    .map(Value::Ref)
                    .map_err(|_| self.error("invalid entity reference"))
            }
            b'\'' => self.parse_string(),
            b'.' => {
                self.pos += 1;
                let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
                if self.bump() != Some(b'.') {
                    return Err(self.error("unterminated enumeration"));
                }
                Ok(Value::Enum(name.to_ascii_uppercase()))
            }
            b'$' => {
                self.pos += 1;
                Ok(Value::Null)
            }
            b'*' => {
                self.pos += 1;
                Ok(Value::Derived)
            }
            b'(' => {
                self.pos += 1;
                Ok(Value::List(self.parse_list()?))
            }
            b'0'..=b'9' | b'-' | b'+' => self.parse_number(),
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
                self.skip_whitespace();
                if self.bump() != Some(b'(') {
                    return Err(self.error(format!("expected '(' after {name}")));
                }
                self.parse_list()?;
                Ok(Value::Typed)
            }
            c => Err(self.error(format!("unexpected character '{}'", c as char))),
        }
    }

    fn parse_string(&mut self) -> StepResult<Value> {
        self.pos += 1;
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                Some(b'\'') => {
                    if self.peek() == Some(b'\'') {
                        self.pos += 1;
                        bytes.push(b'\'');
                    } else {
                        break;
                    }
                }
                Some(c) => bytes.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
        Ok(Value::Str(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn parse_number(&mut self) -> StepResult<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        self.take_while(|c| c.is_ascii_digit());
        let mut real = false;
        if self.peek() == Some(b'.') {
            real = true;
            self.pos += 1;
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            real = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            self.take_while(|c| c.is_ascii_digit());
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid number"))?;
        if real {
            text.parse()
                .map(Value::Real)
                .map_err(|_| self.error(format!("invalid real '{text}'")))
        } else {
            text.parse()
                .map(Value::Integer)
                .map_err(|_| self.error(format!("invalid integer '{text}'")))
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }
}
