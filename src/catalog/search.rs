//! A small subset of the ContentDirectory `SearchCriteria` grammar.
//!
//! ```text
//! expr     := and_expr ("or" and_expr)*
//! and_expr := primary ("and" primary)*
//! primary  := "(" expr ")" | property op quoted | property "exists" ("true" | "false")
//! op       := "=" | "!=" | "contains" | "doesNotContain" | "derivedfrom"
//! ```

use crate::error::ActionError;
use crate::model::MediaObject;

/// Deepest parenthesis nesting accepted in a criteria string.
pub const MAX_NESTING: usize = 32;
/// Most relational clauses accepted in a criteria string.
pub const MAX_CLAUSES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Class,
    Title,
    Creator,
    Artist,
    Album,
    Genre,
}

impl Property {
    fn from_name(name: &str) -> Option<Property> {
        match name {
            "upnp:class" => Some(Property::Class),
            "dc:title" => Some(Property::Title),
            "dc:creator" => Some(Property::Creator),
            "upnp:artist" => Some(Property::Artist),
            "upnp:album" => Some(Property::Album),
            "upnp:genre" => Some(Property::Genre),
            _ => None,
        }
    }

    fn values<'a>(&self, object: &'a MediaObject) -> Vec<&'a str> {
        let base = object.base();
        let single = |s: &'a str| if s.is_empty() { vec![] } else { vec![s] };
        match self {
            Property::Class => single(&base.object_class),
            Property::Title => single(&base.title),
            Property::Creator => single(&base.creator),
            Property::Album => single(&base.affiliation.album),
            Property::Artist => base
                .people
                .artists
                .iter()
                .map(|p| p.name.as_str())
                .filter(|n| !n.is_empty())
                .collect(),
            Property::Genre => base.affiliation.genres.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Contains,
    DoesNotContain,
    DerivedFrom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchExpr {
    And(Box<SearchExpr>, Box<SearchExpr>),
    Or(Box<SearchExpr>, Box<SearchExpr>),
    Compare {
        property: Property,
        op: Operator,
        value: String,
    },
    Exists {
        property: Property,
        present: bool,
    },
}

impl SearchExpr {
    pub fn matches(&self, object: &MediaObject) -> bool {
        match self {
            SearchExpr::And(a, b) => a.matches(object) && b.matches(object),
            SearchExpr::Or(a, b) => a.matches(object) || b.matches(object),
            SearchExpr::Exists { property, present } => {
                !property.values(object).is_empty() == *present
            }
            SearchExpr::Compare {
                property,
                op,
                value,
            } => {
                let needle = value.to_lowercase();
                let values: Vec<String> = property
                    .values(object)
                    .into_iter()
                    .map(str::to_lowercase)
                    .collect();
                match op {
                    Operator::Equal => values.iter().any(|v| *v == needle),
                    Operator::NotEqual => values.iter().all(|v| *v != needle),
                    Operator::Contains => values.iter().any(|v| v.contains(&needle)),
                    Operator::DoesNotContain => values.iter().all(|v| !v.contains(&needle)),
                    Operator::DerivedFrom => values.iter().any(|v| v.starts_with(&needle)),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Word(String),
    Quoted(String),
    Symbol(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, ActionError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => return Err(ActionError::InvalidSearchCriteria),
                        },
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => value.push(c),
                    }
                }
                if !closed {
                    return Err(ActionError::InvalidSearchCriteria);
                }
                tokens.push(Token::Quoted(value));
            }
            '=' | '!' | '<' | '>' => {
                let mut symbol = String::new();
                while let Some(&c) = chars.peek() {
                    if matches!(c, '=' | '!' | '<' | '>') {
                        symbol.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Symbol(symbol));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"' | '=' | '!' | '<' | '>') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    clauses: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn expr(&mut self) -> Result<SearchExpr, ActionError> {
        let mut left = self.and_expr()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let right = self.and_expr()?;
            left = SearchExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<SearchExpr, ActionError> {
        let mut left = self.primary()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let right = self.primary()?;
            left = SearchExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<SearchExpr, ActionError> {
        match self.next() {
            Some(Token::Open) => {
                if self.depth == MAX_NESTING {
                    return Err(ActionError::InvalidSearchCriteria);
                }
                self.depth += 1;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(ActionError::InvalidSearchCriteria),
                }
            }
            Some(Token::Word(name)) => {
                self.clauses += 1;
                if self.clauses > MAX_CLAUSES {
                    return Err(ActionError::InvalidSearchCriteria);
                }
                let property =
                    Property::from_name(&name).ok_or(ActionError::InvalidSearchCriteria)?;
                self.relation(property)
            }
            _ => Err(ActionError::InvalidSearchCriteria),
        }
    }

    fn relation(&mut self, property: Property) -> Result<SearchExpr, ActionError> {
        let op = match self.next() {
            Some(Token::Symbol(s)) if s == "=" => Operator::Equal,
            Some(Token::Symbol(s)) if s == "!=" => Operator::NotEqual,
            Some(Token::Word(w)) if w == "contains" => Operator::Contains,
            Some(Token::Word(w)) if w == "doesNotContain" => Operator::DoesNotContain,
            Some(Token::Word(w)) if w == "derivedfrom" => Operator::DerivedFrom,
            Some(Token::Word(w)) if w == "exists" => {
                let present = match self.next() {
                    Some(Token::Word(v)) if v == "true" => true,
                    Some(Token::Word(v)) if v == "false" => false,
                    _ => return Err(ActionError::InvalidSearchCriteria),
                };
                return Ok(SearchExpr::Exists { property, present });
            }
            _ => return Err(ActionError::InvalidSearchCriteria),
        };

        match self.next() {
            Some(Token::Quoted(value)) => Ok(SearchExpr::Compare {
                property,
                op,
                value,
            }),
            _ => Err(ActionError::InvalidSearchCriteria),
        }
    }
}

/// Parse a `SearchCriteria` argument. Anything outside the supported subset is a 708.
pub fn parse_search(criteria: &str) -> Result<SearchExpr, ActionError> {
    let mut parser = Parser {
        tokens: tokenize(criteria)?,
        pos: 0,
        depth: 0,
        clauses: 0,
    };
    let expr = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(ActionError::InvalidSearchCriteria);
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectBase;

    fn track() -> MediaObject {
        let mut base = ObjectBase {
            title: "Blue in Green".to_string(),
            creator: "Miles Davis".to_string(),
            object_class: "object.item.audioItem.musicTrack".to_string(),
            ..ObjectBase::default()
        };
        base.people.artists.add("Miles Davis", None);
        base.people.artists.add("Bill Evans", Some("Performer"));
        base.affiliation.album = "Kind of Blue".to_string();
        base.affiliation.genres.push("Jazz".to_string());
        MediaObject::item(base)
    }

    #[test]
    fn test_class_derivation() {
        let expr = parse_search(r#"upnp:class derivedfrom "object.item.audioItem""#).unwrap();
        assert!(expr.matches(&track()));
        let expr = parse_search(r#"upnp:class derivedfrom "object.item.videoItem""#).unwrap();
        assert!(!expr.matches(&track()));
    }

    #[test]
    fn test_boolean_combination() {
        let expr = parse_search(
            r#"(upnp:class = "object.item.audioItem.musicTrack" and dc:title contains "green") or upnp:genre = "Rock""#,
        )
        .unwrap();
        assert!(expr.matches(&track()));

        let expr =
            parse_search(r#"upnp:artist = "Bill Evans" and upnp:album doesNotContain "blue""#)
                .unwrap();
        assert!(!expr.matches(&track()));
    }

    #[test]
    fn test_exists_and_not_equal() {
        assert!(parse_search("upnp:genre exists true").unwrap().matches(&track()));
        assert!(!parse_search("upnp:genre exists false").unwrap().matches(&track()));
        assert!(parse_search(r#"dc:creator != "Coltrane""#).unwrap().matches(&track()));
    }

    #[test]
    fn test_escaped_quote() {
        let expr = parse_search(r#"dc:title = "say \"hi\"""#).unwrap();
        assert_eq!(
            expr,
            SearchExpr::Compare {
                property: Property::Title,
                op: Operator::Equal,
                value: "say \"hi\"".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        for criteria in [
            r#"dc:title < "x""#,
            r#"upnp:rating = "5""#,
            r#"dc:title = unquoted"#,
            r#"(dc:title = "x""#,
            r#"dc:title = "x" dc:creator = "y""#,
            r#"dc:title = "x"#,
            "and",
        ] {
            assert_eq!(
                parse_search(criteria),
                Err(ActionError::InvalidSearchCriteria),
                "{}",
                criteria
            );
        }
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            format!("{}dc:title = \"x\"{}", "(".repeat(depth), ")".repeat(depth))
        };
        assert!(parse_search(&nested(MAX_NESTING)).is_ok());
        assert_eq!(
            parse_search(&nested(MAX_NESTING + 1)),
            Err(ActionError::InvalidSearchCriteria)
        );

        // Rejected before the parser recurses far, even on a small stack.
        let deep = nested(200_000);
        let result = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || parse_search(&deep))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(result, Err(ActionError::InvalidSearchCriteria));
    }

    #[test]
    fn test_clause_limit() {
        let chain = |clauses: usize| vec![r#"upnp:genre = "Jazz""#; clauses].join(" or ");
        assert!(parse_search(&chain(MAX_CLAUSES)).unwrap().matches(&track()));
        assert_eq!(
            parse_search(&chain(MAX_CLAUSES + 1)),
            Err(ActionError::InvalidSearchCriteria)
        );
    }
}
