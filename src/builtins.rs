//! Host functions that bodiless `extern` declarations resolve to by name.

use std::collections::HashMap;
use std::io::{self, Write};

use lazy_static::lazy_static;

pub type HostFn = fn(&[f64], &mut dyn Write) -> io::Result<f64>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub arity: usize,
    pub call: HostFn,
}

macro_rules! unary {
    ($f:ident) => {
        Builtin {
            arity: 1,
            call: |args, _| Ok(args[0].$f()),
        }
    };
}

macro_rules! binary {
    ($f:expr) => {
        Builtin {
            arity: 2,
            call: |args, _| Ok($f(args[0], args[1])),
        }
    };
}

fn putchard(args: &[f64], out: &mut dyn Write) -> io::Result<f64> {
    let c = std::char::from_u32(args[0] as u32).unwrap_or(std::char::REPLACEMENT_CHARACTER);
    write!(out, "{}", c)?;
    out.flush()?;
    Ok(0.0)
}

fn printd(args: &[f64], out: &mut dyn Write) -> io::Result<f64> {
    writeln!(out, "{}", args[0])?;
    Ok(0.0)
}

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, Builtin> = {
        let mut m = HashMap::new();
        m.insert("sin", unary!(sin));
        m.insert("cos", unary!(cos));
        m.insert("tan", unary!(tan));
        m.insert("atan", unary!(atan));
        m.insert("sqrt", unary!(sqrt));
        m.insert("exp", unary!(exp));
        m.insert("log", unary!(ln));
        m.insert("fabs", unary!(abs));
        m.insert("floor", unary!(floor));
        m.insert("ceil", unary!(ceil));
        m.insert("pow", binary!(f64::powf));
        m.insert("fmod", binary!(|a: f64, b: f64| a % b));
        m.insert("putchard", Builtin { arity: 1, call: putchard });
        m.insert("printd", Builtin { arity: 1, call: printd });
        m
    };
}

/// The host function called `name` taking `arity` arguments, if there is one.
pub fn lookup(name: &str, arity: usize) -> Option<Builtin> {
    BUILTINS.get(name).copied().filter(|b| b.arity == arity)
}
