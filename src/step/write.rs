//! Part 21 writer.
//!
//! Emits one `#<id> = KEYWORD(args);` line per entity in ascending id order,
//! wrapped in the HEADER/DATA exchange structure.

use std::fmt::Write as _;

use super::entity::{Curve, Entity, Placement, RawEntity, Ref, Surface};
use super::repository::Repository;

/// Schema identifier for AP214.
pub const AP214_SCHEMA: &str = "AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }";

/// Values written into the HEADER section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepHeader {
    /// `FILE_DESCRIPTION` text.
    pub description: String,
    /// `FILE_NAME` name.
    pub file_name: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Author field.
    pub author: String,
    /// Preprocessor and originating system.
    pub system: String,
}

impl StepHeader {
    /// Creates a header for `file_name` stamped with the current UTC time.
    pub fn now(file_name: impl Into<String>) -> Self {
        Self {
            description: "Circuit board solid model".to_string(),
            file_name: file_name.into(),
            timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            author: String::new(),
            system: concat!("pcb-step-export ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Serializes a repository to ISO-10303-21 text.
#[must_use]
pub fn write_step(repo: &Repository, header: &StepHeader) -> String {
    let mut out = String::with_capacity(64 * repo.len() + 512);

    out.push_str("ISO-10303-21;\n");
    out.push_str("HEADER;\n");
    let _ = writeln!(
        out,
        "FILE_DESCRIPTION(({}),'2;1');",
        quote(&header.description)
    );
    let _ = writeln!(
        out,
        "FILE_NAME({},{},({}),(''),{},{},'');",
        quote(&header.file_name),
        quote(&header.timestamp),
        quote(&header.author),
        quote(&header.system),
        quote(&header.system),
    );
    let _ = writeln!(out, "FILE_SCHEMA(({}));", quote(AP214_SCHEMA));
    out.push_str("ENDSEC;\n");
    out.push_str("DATA;\n");

    for (id, entity) in repo.iter() {
        let record = normalize_exponents(&record(entity));
        let _ = writeln!(out, "#{id} = {record};");
    }

    out.push_str("ENDSEC;\n");
    out.push_str("END-ISO-10303-21;\n");
    out
}

/// Formats one entity as `KEYWORD(args)` (or `(complex)`).
#[must_use]
pub fn record(entity: &Entity) -> String {
    let keyword = entity.keywords().first().copied().unwrap_or_default().to_string();
    let args = match entity {
        Entity::Point(p) => format!("'',({},{},{})", real(p.x), real(p.y), real(p.z)),
        Entity::Direction(d) => format!("'',({},{},{})", real(d.dx), real(d.dy), real(d.dz)),
        Entity::Vector(v) => format!("'',{},{}", r(v.orientation), real(v.magnitude)),
        Entity::Placement(Placement {
            location,
            axis,
            ref_direction,
        }) => format!("'',{},{},{}", r(*location), opt(*axis), opt(*ref_direction)),
        Entity::Curve(Curve::Line { point, vector }) => format!("'',{},{}", r(*point), r(*vector)),
        Entity::Curve(Curve::Circle { placement, radius })
        | Entity::Surface(Surface::Cylinder { placement, radius }) => {
            format!("'',{},{}", r(*placement), real(*radius))
        }
        Entity::Surface(Surface::Plane { placement }) => format!("'',{}", r(*placement)),
        Entity::Vertex(v) => format!("'',{}", r(v.point)),
        Entity::Edge(e) => format!(
            "'',{},{},{},{}",
            r(e.start),
            r(e.end),
            r(e.curve),
            logical(e.same_sense)
        ),
        Entity::OrientedEdge(o) => format!("'',*,*,{},{}", r(o.edge), logical(o.forward)),
        Entity::EdgeLoop(l) => format!("'',{}", list(&l.edges)),
        Entity::FaceBound(b) => format!("'',{},{}", r(b.edge_loop), logical(b.same_sense)),
        Entity::Face(f) => format!(
            "'',{},{},{}",
            list(&f.bounds),
            r(f.surface),
            logical(f.same_sense)
        ),
        Entity::Shell(s) => format!("'',{}", list(&s.faces)),
        Entity::Solid(s) => format!("{},{}", quote(&s.name), r(s.shell)),
        Entity::Raw(RawEntity::Simple { keyword, args }) => return format!("{keyword}({args})"),
        Entity::Raw(RawEntity::Complex { body }) => return format!("({body})"),
    };
    format!("{keyword}({args})")
}

fn r<T>(reference: Ref<T>) -> String {
    format!("#{}", reference.id())
}

fn opt<T>(reference: Option<Ref<T>>) -> String {
    reference.map_or_else(|| "$".to_string(), r)
}

fn list<T>(refs: &[Ref<T>]) -> String {
    let items: Vec<String> = refs.iter().map(|x| r(*x)).collect();
    format!("({})", items.join(","))
}

const fn logical(value: bool) -> &'static str {
    if value {
        ".T."
    } else {
        ".F."
    }
}

/// Quotes a STEP string literal, doubling embedded apostrophes.
#[must_use]
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Formats a real the way Part 21 expects: always with a decimal point,
/// upper-case exponent, no negative zero. Non-finite values are logged
/// and written as zero.
#[must_use]
pub fn real(value: f64) -> String {
    if !value.is_finite() {
        tracing::warn!(value, "Writing non-finite real as 0.");
        return "0.".to_string();
    }
    if value == 0.0 {
        return "0.".to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e15).contains(&magnitude) {
        let mut text = format!("{value:.10}");
        while text.ends_with('0') {
            text.pop();
        }
        if text == "-0." {
            return "0.".to_string();
        }
        text
    } else {
        // `{:E}` gives "1.5E-7" or "1E20"; a mantissa needs its dot.
        let text = format!("{value:E}");
        match text.split_once('E') {
            Some((mantissa, exponent)) if !mantissa.contains('.') => {
                format!("{mantissa}.E{exponent}")
            }
            _ => text,
        }
    }
}

/// Upper-cases the exponent marker of numeric literals outside quoted
/// strings, e.g. `1.5e-07` → `1.5E-07`.
#[must_use]
pub fn normalize_exponents(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;

    for (i, &ch) in chars.iter().enumerate() {
        if ch == '\'' {
            in_string = !in_string;
            out.push(ch);
            continue;
        }
        if !in_string && ch == 'e' && is_exponent_marker(&chars, i) {
            out.push('E');
        } else {
            out.push(ch);
        }
    }
    out
}

/// An `e` is an exponent when it follows a numeric literal and precedes
/// an optionally signed digit.
fn is_exponent_marker(chars: &[char], i: usize) -> bool {
    let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) else {
        return false;
    };
    if !(prev.is_ascii_digit() || prev == '.') {
        return false;
    }
    // The literal must start with a digit, sign or dot, not be part of an
    // identifier like `SOME1e`.
    let mut j = i;
    while j > 0 && (chars[j - 1].is_ascii_digit() || chars[j - 1] == '.') {
        j -= 1;
    }
    if j > 0 && (chars[j - 1].is_ascii_alphabetic() || chars[j - 1] == '_' || chars[j - 1] == '#')
    {
        return false;
    }
    let mut k = i + 1;
    if matches!(chars.get(k), Some('+' | '-')) {
        k += 1;
    }
    chars.get(k).is_some_and(char::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::entity::{Direction, Point, Solid};
    use crate::step::parse::parse_step;

    #[test]
    fn reals_always_have_a_dot() {
        assert_eq!(real(1.0), "1.");
        assert_eq!(real(-2.5), "-2.5");
        assert_eq!(real(0.0), "0.");
        assert_eq!(real(-0.0), "0.");
        assert_eq!(real(1.6), "1.6");
    }

    #[test]
    fn non_finite_reals_are_written_as_zero() {
        assert_eq!(real(f64::NAN), "0.");
        assert_eq!(real(f64::INFINITY), "0.");
        assert_eq!(real(f64::NEG_INFINITY), "0.");
    }

    #[test]
    fn tiny_and_huge_reals_use_upper_exponent() {
        assert_eq!(real(1.5e-7), "1.5E-7");
        assert_eq!(real(1e20), "1.E20");
    }

    #[test]
    fn lowercase_exponents_are_normalized() {
        assert_eq!(
            normalize_exponents("LENGTH_MEASURE(1.e-07),(1.5e3,-2e+2)"),
            "LENGTH_MEASURE(1.E-07),(1.5E3,-2E+2)"
        );
    }

    #[test]
    fn exponent_normalization_skips_strings_and_identifiers() {
        assert_eq!(normalize_exponents("'part 1e5',#12"), "'part 1e5',#12");
        assert_eq!(normalize_exponents("SHAPE1e2(1.e2)"), "SHAPE1e2(1.E2)");
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote("Bob's board"), "'Bob''s board'");
    }

    #[test]
    fn writes_exchange_structure() {
        let mut repo = Repository::new();
        let p = repo.add(Point {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        });
        repo.add(Direction {
            dx: 0.0,
            dy: 0.0,
            dz: 1.0,
        });
        repo.add_entity(Entity::Raw(RawEntity::simple(
            "UNCERTAINTY_MEASURE_WITH_UNIT",
            format!("LENGTH_MEASURE(1.e-07),#{},'distance_accuracy_value',''", p.id()),
        )));

        let text = write_step(&repo, &StepHeader::now("board.step"));
        assert!(text.starts_with("ISO-10303-21;\nHEADER;\n"));
        assert!(text.contains("#1 = CARTESIAN_POINT('',(1.,2.,3.));"));
        assert!(text.contains("#2 = DIRECTION('',(0.,0.,1.));"));
        assert!(text.contains("LENGTH_MEASURE(1.E-07)"));
        assert!(text.trim_end().ends_with("END-ISO-10303-21;"));
    }

    #[test]
    fn written_text_parses_back() {
        let mut repo = Repository::new();
        let p = repo.add(Point {
            x: 0.25,
            y: -1.0,
            z: 1e-9,
        });
        repo.add(Solid {
            name: "it's".to_string(),
            shell: Ref::new(p.id()),
        });
        let text = write_step(&repo, &StepHeader::now("x.step"));
        let back = parse_step(&text).unwrap();
        assert_eq!(back, repo);
    }
}
