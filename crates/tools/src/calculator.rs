//! Calculator tool: evaluates mathematical expressions and converts
//! between units and number bases.
//!
//! Expressions go through a recursive-descent parser: `+ - * / %`, `^` or
//! `**` for powers, parentheses, unary signs, constants (`pi`, `e`, `tau`)
//! and functions such as `sqrt(2)` or `max(1, 2)`. Nothing is ever handed
//! to an interpreter.

use async_trait::async_trait;
use devassist_core::error::ToolError;
use devassist_core::tool::Tool;
use serde_json::{Value, json};
use tracing::debug;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations, unit conversions and number base conversions"
    }

    fn category(&self) -> &str {
        "Utility"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate, or the value to convert, e.g. '(2 + 3) * 4'"
                },
                "operation": {
                    "type": "string",
                    "enum": ["calc", "convert", "base"],
                    "default": "calc"
                },
                "from_unit": { "type": "string", "description": "Source unit (convert)" },
                "to_unit": { "type": "string", "description": "Target unit (convert)" },
                "from_base": { "type": "string", "enum": ["binary", "octal", "decimal", "hex"] },
                "to_base": { "type": "string", "enum": ["binary", "octal", "decimal", "hex"] }
            },
            "required": ["expression"]
        })
    }

    fn validate_input(&self, arguments: &Value) -> Result<(), ToolError> {
        if arguments["expression"].as_str().is_none() {
            return Err(ToolError::InvalidArguments("'expression' must be a string".into()));
        }
        match arguments["operation"].as_str().unwrap_or("calc") {
            "calc" => Ok(()),
            "convert" => {
                for key in ["from_unit", "to_unit"] {
                    let unit = arguments[key].as_str().unwrap_or_default();
                    if unit_factor(unit).is_none() {
                        return Err(ToolError::InvalidArguments(format!("Unsupported unit for {key}: '{unit}'")));
                    }
                }
                Ok(())
            }
            "base" => {
                for key in ["from_base", "to_base"] {
                    let base = arguments[key].as_str().unwrap_or_default();
                    if radix(base).is_none() {
                        return Err(ToolError::InvalidArguments(format!("Unsupported base for {key}: '{base}'")));
                    }
                }
                Ok(())
            }
            other => Err(ToolError::InvalidArguments(format!("Unknown operation: {other}"))),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let expr = arguments["expression"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expression' argument".into()))?;
        let fail = |reason: String| ToolError::failed("calculator", reason);

        match arguments["operation"].as_str().unwrap_or("calc") {
            "convert" => {
                let from = arguments["from_unit"].as_str().unwrap_or_default();
                let to = arguments["to_unit"].as_str().unwrap_or_default();
                let value = match expr.trim().parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => evaluate(expr).map_err(fail)?,
                };
                let converted = convert_units(value, from, to).map_err(fail)?;
                let formatted = format_number(converted, 6);
                Ok(json!({
                    "value": expr,
                    "from_unit": from,
                    "to_unit": to,
                    "result": number_value(converted, 6),
                    "full_result": format!("{formatted} {to}"),
                }))
            }
            "base" => {
                let from = arguments["from_base"].as_str().unwrap_or_default();
                let to = arguments["to_base"].as_str().unwrap_or_default();
                let converted = convert_base(expr, from, to).map_err(fail)?;
                Ok(json!({
                    "value": expr,
                    "from_base": from,
                    "to_base": to,
                    "result": converted.digits,
                    "prefixed_result": converted.prefixed,
                    "decimal_value": converted.decimal.to_string(),
                }))
            }
            _ => {
                let value = evaluate(expr).map_err(|e| fail(format!("Error evaluating expression: {e}")))?;
                debug!(expression = expr, value, "Evaluated expression");
                Ok(json!({
                    "expression": expr,
                    "result": number_value(value, 10),
                    "formatted": format_number(value, 10),
                }))
            }
        }
    }
}

/// Round to `places` decimals and drop a trailing `.0`.
pub fn format_number(value: f64, places: i32) -> String {
    let rounded = round_to(value, places);
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

/// JSON number, integral when the rounded value is whole.
fn number_value(value: f64, places: i32) -> Value {
    let rounded = round_to(value, places);
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        json!(rounded as i64)
    } else {
        json!(rounded)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() { rounded } else { value }
}

// ── Unit conversion ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitKind {
    Length,
    Time,
    Data,
}

/// Factor to the kind's base unit (meter, second, byte).
fn unit_factor(unit: &str) -> Option<(UnitKind, f64)> {
    use UnitKind::*;
    let entry = match unit.to_ascii_lowercase().as_str() {
        "mm" => (Length, 0.001),
        "cm" => (Length, 0.01),
        "m" => (Length, 1.0),
        "km" => (Length, 1000.0),
        "in" => (Length, 0.0254),
        "ft" => (Length, 0.3048),
        "yd" => (Length, 0.9144),
        "mi" => (Length, 1609.344),
        "ms" => (Time, 0.001),
        "sec" => (Time, 1.0),
        "min" => (Time, 60.0),
        "hr" => (Time, 3600.0),
        "day" => (Time, 86_400.0),
        "bit" => (Data, 0.125),
        "byte" => (Data, 1.0),
        "kb" => (Data, 1024.0),
        "mb" => (Data, 1_048_576.0),
        "gb" => (Data, 1_073_741_824.0),
        "tb" => (Data, 1_099_511_627_776.0),
        _ => return None,
    };
    Some(entry)
}

pub fn convert_units(value: f64, from: &str, to: &str) -> Result<f64, String> {
    let (Some((from_kind, from_factor)), Some((to_kind, to_factor))) = (unit_factor(from), unit_factor(to)) else {
        return Err(format!("Unsupported units: {from} or {to}"));
    };
    if from_kind != to_kind {
        return Err(format!("Incompatible unit categories: {from_kind:?} and {to_kind:?}"));
    }
    Ok(value * from_factor / to_factor)
}

// ── Base conversion ──────────────────────────────────────────────────────

fn radix(base: &str) -> Option<u32> {
    match base.to_ascii_lowercase().as_str() {
        "binary" => Some(2),
        "octal" => Some(8),
        "decimal" => Some(10),
        "hex" => Some(16),
        _ => None,
    }
}

pub struct BaseConversion {
    pub digits: String,
    pub prefixed: String,
    pub decimal: i128,
}

pub fn convert_base(value: &str, from: &str, to: &str) -> Result<BaseConversion, String> {
    let (Some(from_radix), Some(to_radix)) = (radix(from), radix(to)) else {
        return Err(format!("Unsupported bases: {from} or {to}"));
    };

    let cleaned = value.trim().to_ascii_lowercase();
    let signs = cleaned.chars().take_while(|c| matches!(c, '-' | '+')).count();
    if signs > 1 {
        return Err(format!("Invalid {from} value: {value}"));
    }
    let negative = cleaned.starts_with('-');
    let cleaned = cleaned[signs..].to_string();
    let prefix = match from_radix {
        16 => "0x",
        2 => "0b",
        8 => "0o",
        _ => "",
    };
    let digits = cleaned.strip_prefix(prefix).filter(|_| !prefix.is_empty()).unwrap_or(cleaned.as_str());

    let magnitude = u128::from_str_radix(digits, from_radix).map_err(|_| format!("Invalid {from} value: {value}"))?;
    let decimal = if negative {
        0i128.checked_sub_unsigned(magnitude)
    } else {
        i128::try_from(magnitude).ok()
    }
    .ok_or_else(|| format!("Value out of range: {value}"))?;

    let body = match to_radix {
        2 => format!("{:b}", magnitude),
        8 => format!("{:o}", magnitude),
        16 => format!("{:x}", magnitude),
        _ => magnitude.to_string(),
    };
    let sign = if negative { "-" } else { "" };
    let out_prefix = match to_radix {
        16 => "0x",
        2 => "0b",
        8 => "0o",
        _ => "",
    };
    Ok(BaseConversion {
        digits: format!("{sign}{body}"),
        prefixed: format!("{sign}{out_prefix}{body}"),
        decimal,
    })
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Evaluate a mathematical expression string.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(format!(
            "Unexpected token at position {}: {:?}",
            parser.pos, parser.tokens[parser.pos]
        ));
    }
    if !result.is_finite() {
        return Err("Result is not a finite number".into());
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Comma,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' if chars.get(i + 1) == Some(&'*') => { tokens.push(Token::Caret); i += 2; }
            '*' | 'x' | '×' if chars[i] != 'x' || is_infix_x(&chars, i) => { tokens.push(Token::Star); i += 1; }
            '/' | '÷' => { tokens.push(Token::Slash); i += 1; }
            '%' => { tokens.push(Token::Percent); i += 1; }
            '^' => { tokens.push(Token::Caret); i += 1; }
            ',' => { tokens.push(Token::Comma); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("Invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect::<String>().to_ascii_lowercase()));
            }
            c => return Err(format!("Unexpected character: '{}'", c)),
        }
    }

    Ok(tokens)
}

/// `x` between two operands reads as multiplication ("3 x 4").
fn is_infix_x(chars: &[char], i: usize) -> bool {
    let prev = chars[..i].iter().rev().find(|c| !c.is_whitespace());
    let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
    let standalone = chars.get(i + 1).is_none_or(|c| !c.is_ascii_alphanumeric() || c.is_ascii_digit())
        && (i == 0 || !chars[i - 1].is_ascii_alphabetic());
    standalone
        && prev.is_some_and(|c| c.is_ascii_digit() || *c == ')' || *c == '.')
        && next.is_some_and(|c| c.is_ascii_digit() || *c == '(' || *c == '.')
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        _ => None,
    }
}

fn apply_function(name: &str, args: &[f64]) -> Result<f64, String> {
    let one = || match args {
        [x] => Ok(*x),
        _ => Err(format!("{name}() takes exactly one argument")),
    };
    let value = match name {
        "sin" => one()?.sin(),
        "cos" => one()?.cos(),
        "tan" => one()?.tan(),
        "asin" => one()?.asin(),
        "acos" => one()?.acos(),
        "atan" => one()?.atan(),
        "sqrt" => {
            let x = one()?;
            if x < 0.0 {
                return Err("sqrt() of a negative number".into());
            }
            x.sqrt()
        }
        "exp" => one()?.exp(),
        "abs" => one()?.abs(),
        "ceil" => one()?.ceil(),
        "floor" => one()?.floor(),
        "round" => one()?.round(),
        "ln" => one()?.ln(),
        "log10" => one()?.log10(),
        "log2" => one()?.log2(),
        "log" => match args {
            [x] => x.ln(),
            [x, base] => x.log(*base),
            _ => return Err("log() takes one or two arguments".into()),
        },
        "pow" => match args {
            [x, y] => x.powf(*y),
            _ => return Err("pow() takes exactly two arguments".into()),
        },
        "max" | "min" if args.is_empty() => return Err(format!("{name}() needs at least one argument")),
        "max" => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        "min" => args.iter().copied().fold(f64::INFINITY, f64::min),
        other => return Err(format!("Unsupported function: {other}")),
    };
    Ok(value)
}

/// Nesting limit for parentheses, unary signs and powers.
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut left = self.parse_term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.consume();
                    left += self.parse_term()?;
                }
                Token::Minus => {
                    self.consume();
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term = unary (('*' | '/' | '%') unary)*
    fn parse_term(&mut self) -> Result<f64, String> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.consume();
                    left *= self.parse_unary()?;
                }
                Token::Slash => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err("Division by zero".into());
                    }
                    left /= right;
                }
                Token::Percent => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err("Modulo by zero".into());
                    }
                    left -= right * (left / right).floor();
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // unary = ('-' | '+') unary | power
    //
    // Every recursive path passes through here, so this is where depth is counted.
    fn parse_unary(&mut self) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("Expression nested too deeply".into());
        }
        self.depth += 1;
        let value = self.parse_signed();
        self.depth -= 1;
        value
    }

    fn parse_signed(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                Ok(-self.parse_unary()?)
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power = primary ('^' unary)?   (right-associative)
    fn parse_power(&mut self) -> Result<f64, String> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary = NUMBER | IDENT | IDENT '(' args ')' | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, String> {
        match self.consume().cloned() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let args = self.parse_args()?;
                    return apply_function(&name, &args);
                }
                constant(&name).ok_or_else(|| format!("Unknown variable: {name}"))
            }
            Some(Token::LParen) => {
                let val = self.parse_expr()?;
                match self.consume() {
                    Some(Token::RParen) => Ok(val),
                    _ => Err("Expected closing parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("Unexpected token: {:?}", tok)),
            None => Err("Unexpected end of expression".into()),
        }
    }

    // args = (expr (',' expr)*)? ')'
    fn parse_args(&mut self) -> Result<Vec<f64>, String> {
        let mut args = Vec::new();
        if let Some(Token::RParen) = self.peek() {
            self.consume();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.consume() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                _ => return Err("Expected ',' or ')' in argument list".into()),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_addition() {
        assert_eq!(evaluate("2 + 3").unwrap(), 5.0);
        assert_eq!(evaluate("2+2").unwrap(), 4.0);
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("2 * 3 ^ 2").unwrap(), 18.0);
    }

    #[test]
    fn parentheses() {
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn powers_are_right_associative() {
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("2 ** 10").unwrap(), 1024.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
    }

    #[test]
    fn division_and_modulo() {
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
        assert_eq!(evaluate("10 % 4").unwrap(), 2.0);
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("1 % 0").is_err());
    }

    #[test]
    fn infix_x_multiplies() {
        assert_eq!(evaluate("3 x 4").unwrap(), 12.0);
        assert!(evaluate("x").is_err());
    }

    #[test]
    fn functions_and_constants() {
        assert_eq!(evaluate("sqrt(16)").unwrap(), 4.0);
        assert_eq!(evaluate("max(1, 7, 3)").unwrap(), 7.0);
        assert_eq!(evaluate("pow(2, 8)").unwrap(), 256.0);
        assert!((evaluate("2 * pi").unwrap() - std::f64::consts::TAU).abs() < 1e-12);
        assert!((evaluate("log(8, 2)").unwrap() - 3.0).abs() < 1e-12);
        assert!(evaluate("sqrt(-1)").is_err());
        assert!(evaluate("frobnicate(1)").is_err());
        assert!(evaluate("answer").is_err());
    }

    #[test]
    fn invalid_expressions() {
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("2 $ 3").is_err());
        assert!(evaluate("max(1 2)").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(evaluate(&parens).unwrap_err(), "Expression nested too deeply");

        let signs = format!("{}1", "-".repeat(100_000));
        assert_eq!(evaluate(&signs).unwrap_err(), "Expression nested too deeply");

        let powers = vec!["1"; 100_000].join("^");
        assert_eq!(evaluate(&powers).unwrap_err(), "Expression nested too deeply");
    }

    #[test]
    fn moderate_nesting_still_evaluates() {
        let parens = format!("{}7{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&parens).unwrap(), 7.0);
        assert_eq!(evaluate(&format!("{}3", "-".repeat(100))).unwrap(), 3.0);
    }

    #[test]
    fn formatting_drops_float_noise() {
        assert_eq!(format_number(0.1 + 0.2, 10), "0.3");
        assert_eq!(format_number(5.0, 10), "5");
        assert_eq!(format_number(2.5, 10), "2.5");
    }

    #[test]
    fn unit_conversion() {
        assert!((convert_units(1.0, "km", "m").unwrap() - 1000.0).abs() < 1e-9);
        assert!((convert_units(2.0, "hr", "min").unwrap() - 120.0).abs() < 1e-9);
        assert!((convert_units(1.0, "GB", "mb").unwrap() - 1024.0).abs() < 1e-9);
        assert!(convert_units(1.0, "km", "sec").is_err());
        assert!(convert_units(1.0, "parsec", "m").is_err());
    }

    #[test]
    fn base_conversion() {
        let hex = convert_base("255", "decimal", "hex").unwrap();
        assert_eq!(hex.digits, "ff");
        assert_eq!(hex.prefixed, "0xff");

        let bin = convert_base("0b1010", "binary", "decimal").unwrap();
        assert_eq!(bin.decimal, 10);

        let neg = convert_base("-8", "decimal", "octal").unwrap();
        assert_eq!(neg.prefixed, "-0o10");

        assert!(convert_base("12", "binary", "hex").is_err());
        assert!(convert_base("1", "base64", "hex").is_err());
    }

    #[test]
    fn base_conversion_rejects_repeated_signs() {
        assert!(convert_base("--5", "decimal", "hex").is_err());
        assert!(convert_base("-+5", "decimal", "hex").is_err());
        assert!(convert_base("+5", "decimal", "hex").is_ok());
    }

    #[test]
    fn base_conversion_at_i128_bounds() {
        let min = i128::MIN.to_string();
        let converted = convert_base(&min, "decimal", "decimal").unwrap();
        assert_eq!(converted.decimal, i128::MIN);

        let max = i128::MAX.to_string();
        assert_eq!(convert_base(&max, "decimal", "decimal").unwrap().decimal, i128::MAX);
        let past_min = (i128::MIN.unsigned_abs() + 1).to_string();
        assert!(convert_base(&format!("-{past_min}"), "decimal", "decimal").is_err());
        assert!(convert_base(&(i128::MAX as u128 + 1).to_string(), "decimal", "decimal").is_err());
    }

    #[tokio::test]
    async fn tool_execute() {
        let tool = CalculatorTool;
        let result = tool.execute(json!({"expression": "2 + 3"})).await.unwrap();
        assert_eq!(result["result"], 5);
        assert_eq!(result["formatted"], "5");
        assert_eq!(result["expression"], "2 + 3");
    }

    #[tokio::test]
    async fn tool_convert_and_base() {
        let tool = CalculatorTool;
        let km = tool
            .execute(json!({"expression": "1.5", "operation": "convert", "from_unit": "km", "to_unit": "m"}))
            .await
            .unwrap();
        assert_eq!(km["result"], 1500);
        assert_eq!(km["full_result"], "1500 m");

        let hex = tool
            .execute(json!({"expression": "ff", "operation": "base", "from_base": "hex", "to_base": "decimal"}))
            .await
            .unwrap();
        assert_eq!(hex["result"], "255");
    }

    #[tokio::test]
    async fn tool_reports_evaluation_errors() {
        let tool = CalculatorTool;
        let err = tool.execute(json!({"expression": "1 / 0"})).await.unwrap_err();
        assert!(err.to_string().contains("Division by zero"));
    }

    #[test]
    fn validation_checks_operation_arguments() {
        let tool = CalculatorTool;
        assert!(tool.validate_input(&json!({"expression": "1"})).is_ok());
        assert!(tool.validate_input(&json!({})).is_err());
        assert!(
            tool.validate_input(&json!({"expression": "1", "operation": "convert", "from_unit": "km"}))
                .is_err()
        );
        assert!(
            tool.validate_input(&json!({"expression": "1", "operation": "base", "from_base": "hex", "to_base": "binary"}))
                .is_ok()
        );
    }
}
