//! `printf`-style formatting of output steps.
//!
//! Arguments are model values, so only constants format as numbers. Any
//! other argument prints as its expression text.

use gbmc_expr::{Constant, Expr, ExprKind, ExprPrinter, SymbolTable};

/// One parsed conversion directive.
#[derive(Debug, Default)]
struct Directive {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alternate: bool,
    width: usize,
    precision: Option<usize>,
    conversion: char,
}

/// Formats a format string against a list of argument values.
pub struct PrintfFormatter<'a> {
    printer: ExprPrinter<'a>,
}

impl<'a> PrintfFormatter<'a> {
    pub fn new(ns: &'a SymbolTable) -> Self {
        Self {
            printer: ExprPrinter::new(ns),
        }
    }

    /// Expand `format`. Conversions without a matching argument print nothing.
    pub fn format(&mut self, format: &str, args: &[Expr]) -> String {
        let mut out = String::new();
        let mut args = args.iter();
        let mut chars = format.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                out.push('%');
                continue;
            }

            let mut directive = Directive::default();
            while let Some(&flag) = chars.peek() {
                match flag {
                    '-' => directive.left = true,
                    '+' => directive.plus = true,
                    ' ' => directive.space = true,
                    '0' => directive.zero = true,
                    '#' => directive.alternate = true,
                    _ => break,
                }
                chars.next();
            }

            if chars.peek() == Some(&'*') {
                chars.next();
                // a negative `*` width means left-justified
                let width = args.next().and_then(Expr::as_int).unwrap_or(0);
                if width < 0 {
                    directive.left = true;
                }
                directive.width = clamp_field(width.unsigned_abs());
            } else {
                directive.width = read_number(&mut chars).unwrap_or(0);
            }

            if chars.peek() == Some(&'.') {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // a negative `*` precision is taken as omitted
                    let precision = args.next().and_then(Expr::as_int).unwrap_or(0);
                    directive.precision = u128::try_from(precision).ok().map(clamp_field);
                } else {
                    directive.precision = Some(read_number(&mut chars).unwrap_or(0));
                }
            }

            // length modifiers do not change how model values print
            while matches!(chars.peek(), Some('h' | 'l' | 'z' | 'j' | 't' | 'L' | 'q')) {
                chars.next();
            }

            let Some(conversion) = chars.next() else {
                break;
            };
            directive.conversion = conversion;
            let Some(arg) = args.next() else {
                continue;
            };
            let text = self.convert(&directive, arg);
            out.push_str(&text);
        }
        out
    }

    fn convert(&mut self, directive: &Directive, arg: &Expr) -> String {
        match directive.conversion {
            'd' | 'i' => match arg.as_int() {
                Some(v) => {
                    let digits = with_min_digits(v.unsigned_abs().to_string(), directive.precision);
                    pad_number(directive, v < 0, "", &digits)
                }
                None => pad(directive, &self.printer.print(arg)),
            },
            'u' | 'x' | 'X' | 'o' => match arg.as_int() {
                Some(v) => {
                    let v = as_unsigned(v, arg);
                    let (digits, prefix) = match directive.conversion {
                        'u' => (v.to_string(), ""),
                        'x' => (format!("{v:x}"), "0x"),
                        'X' => (format!("{v:X}"), "0X"),
                        _ => (format!("{v:o}"), "0"),
                    };
                    let prefix = if directive.alternate && v != 0 { prefix } else { "" };
                    let directive = Directive {
                        plus: false,
                        space: false,
                        ..*directive
                    };
                    pad_number(&directive, false, prefix, &with_min_digits(digits, directive.precision))
                }
                None => pad(directive, &self.printer.print(arg)),
            },
            'c' => {
                let c = arg
                    .as_int()
                    .and_then(|v| u32::try_from(v).ok())
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default();
                pad(directive, &c)
            }
            's' => {
                let text = match &arg.kind {
                    ExprKind::Constant(Constant::String(s)) => s.clone(),
                    _ => self.printer.print(arg),
                };
                let text = match directive.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                };
                pad(directive, &text)
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' => match arg.as_f64() {
                Some(v) => {
                    let precision = directive.precision.unwrap_or(6);
                    let body = match directive.conversion {
                        'f' | 'F' => format!("{:.*}", precision, v.abs()),
                        'e' => format_exp(v.abs(), precision),
                        'E' => format_exp(v.abs(), precision).to_uppercase(),
                        'g' => format_general(v.abs(), precision, directive.alternate),
                        _ => format_general(v.abs(), precision, directive.alternate).to_uppercase(),
                    };
                    pad_number(directive, v.is_sign_negative() && v != 0.0, "", &body)
                }
                None => pad(directive, &self.printer.print(arg)),
            },
            'p' => match &arg.kind {
                ExprKind::Constant(Constant::Null) => pad(directive, "(nil)"),
                ExprKind::Constant(Constant::Int(v)) => pad(directive, &format!("0x{:x}", v)),
                _ => pad(directive, &self.printer.print(arg)),
            },
            _ => String::new(),
        }
    }
}

/// Convenience wrapper around [`PrintfFormatter`].
pub fn printf_format(ns: &SymbolTable, format: &str, args: &[Expr]) -> String {
    PrintfFormatter::new(ns).format(format, args)
}

/// Largest width or precision honoured.
const MAX_FIELD: usize = 4096;

fn clamp_field(value: u128) -> usize {
    usize::try_from(value).map_or(MAX_FIELD, |v| v.min(MAX_FIELD))
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        let next = value.unwrap_or(0).saturating_mul(10).saturating_add(d as usize);
        value = Some(next.min(MAX_FIELD));
    }
    value
}

/// Reinterpret a negative value in the argument's bit width.
fn as_unsigned(v: i128, arg: &Expr) -> u128 {
    if v >= 0 {
        return v as u128;
    }
    let width = arg.ty.width().unwrap_or(64).min(127);
    (v + (1i128 << width)) as u128
}

fn with_min_digits(digits: String, precision: Option<usize>) -> String {
    match precision {
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    }
}

fn pad(directive: &Directive, text: &str) -> String {
    let len = text.chars().count();
    if len >= directive.width {
        return text.to_string();
    }
    let fill = " ".repeat(directive.width - len);
    if directive.left {
        format!("{text}{fill}")
    } else {
        format!("{fill}{text}")
    }
}

fn pad_number(directive: &Directive, negative: bool, prefix: &str, digits: &str) -> String {
    let sign = if negative {
        "-"
    } else if directive.plus {
        "+"
    } else if directive.space {
        " "
    } else {
        ""
    };
    let len = sign.len() + prefix.len() + digits.len();
    let integer_precision = directive.precision.is_some()
        && !matches!(directive.conversion, 'f' | 'F' | 'e' | 'E' | 'g' | 'G');
    if directive.zero && !directive.left && !integer_precision && len < directive.width {
        let zeros = "0".repeat(directive.width - len);
        return format!("{sign}{prefix}{zeros}{digits}");
    }
    pad(directive, &format!("{sign}{prefix}{digits}"))
}

/// `%e` body: mantissa with `precision` digits, exponent with sign and at
/// least two digits.
fn format_exp(v: f64, precision: usize) -> String {
    let text = format!("{:.*e}", precision, v);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => text,
    }
}

fn format_general(v: f64, precision: usize, alternate: bool) -> String {
    let p = precision.max(1);
    if v == 0.0 {
        return if alternate {
            format!("{:.*}", p - 1, 0.0)
        } else {
            "0".to_string()
        };
    }
    let rounded = format!("{:.*e}", p - 1, v);
    let exp: i32 = rounded
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    let text = if exp < -4 || exp >= p as i32 {
        format_exp(v, p - 1)
    } else {
        format!("{:.*}", (p as i32 - 1 - exp).max(0) as usize, v)
    };
    if alternate {
        return text;
    }
    strip_trailing_zeros(&text)
}

fn strip_trailing_zeros(text: &str) -> String {
    let (mantissa, exp) = match text.find('e') {
        Some(i) => text.split_at(i),
        None => (text, ""),
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{mantissa}{exp}")
}
