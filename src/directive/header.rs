//! Directive header parsing
//!
//! Splits a block body into its keyword arguments and the query that follows:
//!
//! ```text
//! MULTIPLOT(algo, t.size) SELECT ...   -> (["algo", "t.size"], "SELECT ...")
//! SINGLEPLOT(baseline) SELECT ...      -> (["baseline"], "SELECT ...")
//! TABULAR SELECT ...                   -> "SELECT ..."
//! DEFINE speed(col) $col / time        -> ("speed", ["col"], "$col / time")
//! ```

use super::error::{DirectiveError, DirectiveResult};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, multispace0, multispace1},
    combinator::recognize,
    multi::{many0_count, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// A parsed `DEFINE name(p1, ...) body`
#[derive(Debug, Clone, PartialEq)]
pub struct MacroHeader<'a> {
    pub name: &'a str,
    pub params: Vec<&'a str>,
    pub body: &'a str,
}

/// Parse an identifier: a letter or `_` followed by letters, digits or `_`
pub fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Parse `KEYWORD(inner)` and return the inner text
fn keyword_call<'a>(keyword: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(
        tuple((multispace0, tag(keyword), multispace0)),
        delimited(char('('), take_while(|c: char| c != ')'), char(')')),
    )
}

/// Split `KEYWORD(a, b, ...) rest` into its comma-separated arguments and `rest`
pub fn parse_call<'a>(keyword: &'static str, body: &'a str) -> DirectiveResult<(Vec<String>, &'a str)> {
    let missing = || DirectiveError::MissingArgument {
        directive: keyword.to_string(),
        body: body.trim().to_string(),
    };

    let (rest, inner) = keyword_call(keyword)(body).map_err(|_| missing())?;
    let args: Vec<String> = inner
        .split(',')
        .map(|arg| arg.trim().to_string())
        .collect();

    if args.iter().any(String::is_empty) {
        return Err(missing());
    }

    Ok((args, rest.trim()))
}

/// Split `KEYWORD(label) rest` into the whole label and `rest`
pub fn parse_label<'a>(keyword: &'static str, body: &'a str) -> DirectiveResult<(String, &'a str)> {
    let (rest, inner) = keyword_call(keyword)(body).map_err(|_| DirectiveError::MissingArgument {
        directive: keyword.to_string(),
        body: body.trim().to_string(),
    })?;

    let label = inner.trim();
    if label.is_empty() {
        return Err(DirectiveError::MissingArgument {
            directive: keyword.to_string(),
            body: body.trim().to_string(),
        });
    }

    Ok((label.to_string(), rest.trim()))
}

/// Strip a bare `KEYWORD` and return the query after it
pub fn parse_bare<'a>(keyword: &'static str, body: &'a str) -> DirectiveResult<&'a str> {
    let rest = body
        .trim_start()
        .strip_prefix(keyword)
        .map(str::trim)
        .unwrap_or_default();

    if rest.is_empty() {
        return Err(DirectiveError::MissingArgument {
            directive: keyword.to_string(),
            body: body.trim().to_string(),
        });
    }
    Ok(rest)
}

fn macro_header(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    let (input, _) = tuple((multispace0, tag("DEFINE"), multispace1))(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, params) = delimited(
        pair(char('('), multispace0),
        separated_list0(delimited(multispace0, char(','), multispace0), identifier),
        pair(multispace0, char(')')),
    )(input)?;
    Ok((input, (name, params)))
}

/// Parse the body of a `DEFINE` block
pub fn parse_macro_definition(body: &str) -> DirectiveResult<MacroHeader<'_>> {
    let (rest, (name, params)) = macro_header(body)
        .map_err(|_| DirectiveError::InvalidMacroDefinition(body.trim().to_string()))?;

    Ok(MacroHeader {
        name,
        params,
        body: rest.trim(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        let (args, rest) =
            parse_call("MULTIPLOT", " MULTIPLOT(algo,  t.size ) SELECT x FROM t").unwrap();
        assert_eq!(args, vec!["algo", "t.size"]);
        assert_eq!(rest, "SELECT x FROM t");
    }

    #[test]
    fn test_parse_call_missing_arguments() {
        assert!(matches!(
            parse_call("MULTIPLOT", "MULTIPLOT SELECT x FROM t"),
            Err(DirectiveError::MissingArgument { .. })
        ));
        assert!(parse_call("MULTIPLOT", "MULTIPLOT() SELECT 1").is_err());
        assert!(parse_call("MULTIPLOT", "MULTIPLOT(a,,b) SELECT 1").is_err());
    }

    #[test]
    fn test_parse_label_keeps_commas() {
        let (label, rest) = parse_label("SINGLEPLOT", "SINGLEPLOT(run, fast) SELECT 1").unwrap();
        assert_eq!(label, "run, fast");
        assert_eq!(rest, "SELECT 1");
    }

    #[test]
    fn test_parse_bare() {
        assert_eq!(parse_bare("TABULAR", "TABULAR SELECT * FROM t").unwrap(), "SELECT * FROM t");
        assert!(parse_bare("TABULAR", "TABULAR   ").is_err());
    }

    #[test]
    fn test_parse_macro_definition() {
        let header = parse_macro_definition("DEFINE ratio(a, b) $a / $b").unwrap();
        assert_eq!(header.name, "ratio");
        assert_eq!(header.params, vec!["a", "b"]);
        assert_eq!(header.body, "$a / $b");

        let header = parse_macro_definition("DEFINE now() 42").unwrap();
        assert!(header.params.is_empty());

        assert!(parse_macro_definition("DEFINE 1bad(a) $a").is_err());
        assert!(parse_macro_definition("DEFINE noparens $a").is_err());
    }
}
