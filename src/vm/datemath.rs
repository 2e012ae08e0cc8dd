// Copyright 2025 Siftql Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Date math and boundary analysis
//!
//! Time-relative literals (`"now-3d"`, `"now+1h"`) resolve against an
//! anchor instant. [`DateConverter`] inspects a boolean expression for such
//! literals, evaluates the current truth value, and computes the earliest
//! future instant at which the expression could flip, so callers can
//! schedule re-evaluation instead of polling.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Months, Utc};
use regex::Regex;

use crate::core::{Error, Result, Value};
use crate::expr::context::EvalContext;
use crate::expr::node::{Node, Operator};

use super::eval;

/// Detector for time-relative literals.
fn now_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^now([+-].*)*$").unwrap())
}

/// True when the string is a date-math literal (`now`, `now-3d`, ...).
pub fn is_date_math(s: &str) -> bool {
    now_regex().is_match(&s.trim().to_lowercase())
}

/// Resolve a date-math literal relative to the anchor instant.
///
/// Grammar: `now` followed by any number of `±<digits><unit>` offsets with
/// units `s m h d w M y`. Malformed strings (`now-`, `now+now`, `now-3x`)
/// are errors.
pub fn eval_anchor(anchor: DateTime<Utc>, expr: &str) -> Result<DateTime<Utc>> {
    let trimmed = expr.trim();
    match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("now") => {}
        _ => return Err(Error::invalid_date_math(expr)),
    }
    // Units are case-sensitive (m = minute, M = month), so offsets parse
    // from the original text.
    let rest = &trimmed[3..];

    let mut t = anchor;
    let mut chars = rest.chars().peekable();
    while let Some(sign) = chars.next() {
        let negative = match sign {
            '+' => false,
            '-' => true,
            _ => return Err(Error::invalid_date_math(expr)),
        };

        let mut digits = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(*c);
                chars.next();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(Error::invalid_date_math(expr));
        }
        let n: i64 = digits
            .parse()
            .map_err(|_| Error::invalid_date_math(expr))?;

        let unit = match chars.next() {
            Some(u) => u,
            None => return Err(Error::invalid_date_math(expr)),
        };
        t = apply_offset(t, negative, n, unit).ok_or_else(|| Error::invalid_date_math(expr))?;
    }
    Ok(t)
}

fn apply_offset(t: DateTime<Utc>, negative: bool, n: i64, unit: char) -> Option<DateTime<Utc>> {
    let duration = match unit {
        's' => Some(Duration::seconds(n)),
        'm' => Some(Duration::minutes(n)),
        'h' => Some(Duration::hours(n)),
        'd' => Some(Duration::days(n)),
        'w' => Some(Duration::weeks(n)),
        _ => None,
    };
    if let Some(d) = duration {
        return Some(if negative { t - d } else { t + d });
    }
    let months = match unit {
        'M' => Months::new(n as u32),
        'y' => Months::new((n as u32).checked_mul(12)?),
        _ => return None,
    };
    if negative {
        t.checked_sub_months(months)
    } else {
        t.checked_add_months(months)
    }
}

/// Coerce a value to a timestamp, resolving date-math strings against the
/// anchor. Everything else defers to [`Value::to_time`].
pub fn value_to_time_anchored(v: &Value, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Value::String(s) = v {
        if is_date_math(s) {
            return eval_anchor(anchor, s).ok();
        }
    }
    v.to_time()
}

// ============================================================================
// Boundary analysis
// ============================================================================

/// One date-math site found in the expression.
#[derive(Debug, Clone)]
enum BoundaryFn {
    /// `operand OP "now±Δ"` with the literal normalized to the right side.
    Compare {
        op: Operator,
        operand: Node,
        literal: String,
    },
    /// `subject BETWEEN low AND high` with a date-math bound.
    Between {
        subject: Node,
        low: Node,
        high: Node,
    },
}

/// Inspects a boolean expression for date math and calculates the time
/// boundary at which the expression may change truth value.
///
/// Only the earliest possible boundary is reported; complex logic (ORs)
/// may in fact not change at that instant. Includes are assumed to be
/// pre-resolved; unresolved ones are treated as non-date-math subtrees.
#[derive(Debug)]
pub struct DateConverter {
    /// Whether the expression contains any date math at all.
    pub has_date_math: bool,
    anchor: DateTime<Utc>,
    boundary: Option<DateTime<Utc>>,
}

impl DateConverter {
    /// Analyze against the current wall clock. The only wall-clock read in
    /// the crate; use [`DateConverter::at_anchor`] for determinism.
    pub fn new(ctx: &dyn EvalContext, node: &Node) -> Result<DateConverter> {
        Self::at_anchor(Utc::now(), ctx, node)
    }

    /// Analyze against an explicit anchor instant.
    pub fn at_anchor(
        anchor: DateTime<Utc>,
        ctx: &dyn EvalContext,
        node: &Node,
    ) -> Result<DateConverter> {
        let mut fns = Vec::new();
        collect_boundary_fns(node, &mut fns);

        let mut dc = DateConverter {
            has_date_math: false,
            anchor,
            boundary: None,
        };
        for f in &fns {
            dc.apply(ctx, f)?;
        }
        dc.has_date_math = !fns.is_empty();
        Ok(dc)
    }

    /// The earliest future instant at which the expression could change
    /// truth value; `None` means it never will.
    pub fn boundary(&self) -> Option<DateTime<Utc>> {
        self.boundary
    }

    /// The anchor the analysis ran against.
    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    fn propose(&mut self, candidate: DateTime<Utc>) {
        match self.boundary {
            Some(current) if current <= candidate => {}
            _ => self.boundary = Some(candidate),
        }
    }

    fn apply(&mut self, ctx: &dyn EvalContext, f: &BoundaryFn) -> Result<()> {
        match f {
            BoundaryFn::Compare {
                op,
                operand,
                literal,
            } => {
                // Rt: the relative instant the literal names right now.
                let rt = eval_anchor(self.anchor, literal)?;

                let lhv = match eval(ctx, operand) {
                    Some(v) => v,
                    // Missing operand contributes no boundary.
                    None => return Ok(()),
                };

                match &lhv {
                    Value::Slice(items) => {
                        for item in items {
                            let ct = item.to_time().ok_or_else(|| {
                                Error::execute(format!(
                                    "could not convert slice value to time: {}",
                                    item
                                ))
                            })?;
                            self.compare_candidate(*op, ct, rt);
                        }
                    }
                    Value::Strings(items) => {
                        for item in items {
                            let ct = Value::string(item).to_time().ok_or_else(|| {
                                Error::execute(format!(
                                    "could not convert slice value to time: {}",
                                    item
                                ))
                            })?;
                            self.compare_candidate(*op, ct, rt);
                        }
                    }
                    other => {
                        let ct = match other.to_time() {
                            Some(t) => t,
                            None => {
                                return Err(Error::execute(format!(
                                    "could not convert {} to time",
                                    other.value_type()
                                )))
                            }
                        };
                        self.compare_candidate(*op, ct, rt);
                    }
                }
                Ok(())
            }
            BoundaryFn::Between { subject, low, high } => {
                let lo = match self.bound_time(ctx, low)? {
                    Some(t) => t,
                    None => return Ok(()),
                };
                let hi = match self.bound_time(ctx, high)? {
                    Some(t) => t,
                    None => return Ok(()),
                };

                let sv = match eval(ctx, subject) {
                    Some(v) => v,
                    None => return Ok(()),
                };
                match &sv {
                    Value::Slice(items) => {
                        for item in items {
                            if let Some(ct) = item.to_time() {
                                self.window_candidate(ct, lo, hi);
                            }
                        }
                    }
                    other => {
                        if let Some(ct) = other.to_time() {
                            self.window_candidate(ct, lo, hi);
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Bound of a BETWEEN: date-math literals must parse, anything else is
    /// coerced best-effort.
    fn bound_time(
        &self,
        ctx: &dyn EvalContext,
        bound: &Node,
    ) -> Result<Option<DateTime<Utc>>> {
        if let Node::String(s) = bound {
            if is_date_math(&s.text) {
                return eval_anchor(self.anchor, &s.text).map(Some);
            }
        }
        match eval(ctx, bound) {
            Some(v) => Ok(value_to_time_anchored(&v, self.anchor)),
            None => Ok(None),
        }
    }

    // Ct = comparison time (left hand side), At = anchor,
    // Rt = relative time named by the literal,
    // Bt = boundary where the comparison flips.
    fn compare_candidate(&mut self, op: Operator, ct: DateTime<Utc>, rt: DateTime<Utc>) {
        match op {
            Operator::Gt | Operator::Ge => {
                // Currently true iff Rt < Ct; flips false at At + (Ct - Rt).
                // If already false it stays false: Rt only advances.
                if rt < ct {
                    self.propose(self.anchor + (ct - rt));
                }
            }
            Operator::Lt | Operator::Le => {
                // Currently true iff Ct < Rt and stays true; otherwise it
                // becomes true at At + (Ct - Rt).
                if ct >= rt {
                    self.propose(self.anchor + (ct - rt));
                }
            }
            // Point equality against an advancing instant is unstable;
            // no boundary is reported.
            _ => {}
        }
    }

    fn window_candidate(&mut self, ct: DateTime<Utc>, lo: DateTime<Utc>, hi: DateTime<Utc>) {
        if ct < lo {
            // Out the past side; the window only advances away.
        } else if ct >= hi {
            // Not yet entered; enters when hi catches up to Ct.
            self.propose(self.anchor + (ct - hi));
        } else {
            // Inside the window; exits when lo catches up to Ct.
            self.propose(self.anchor + (ct - lo));
        }
    }
}

/// Walk the tree collecting one boundary function per date-math literal in
/// a comparison or BETWEEN position.
fn collect_boundary_fns(node: &Node, out: &mut Vec<BoundaryFn>) {
    match node {
        Node::Binary(n) => {
            let comparison = matches!(
                n.op,
                Operator::Eq
                    | Operator::Ne
                    | Operator::Gt
                    | Operator::Ge
                    | Operator::Lt
                    | Operator::Le
            );

            if comparison {
                if let Node::String(s) = n.rhs.as_ref() {
                    if is_date_math(&s.text) {
                        out.push(BoundaryFn::Compare {
                            op: n.op,
                            operand: n.lhs.as_ref().clone(),
                            literal: s.text.clone(),
                        });
                        collect_boundary_fns(&n.lhs, out);
                        return;
                    }
                }
                if let Node::String(s) = n.lhs.as_ref() {
                    if is_date_math(&s.text) {
                        // Literal on the left: swap sides and invert the
                        // operator so the identity lands on the left.
                        let op = match n.op {
                            Operator::Gt => Operator::Lt,
                            Operator::Ge => Operator::Le,
                            Operator::Lt => Operator::Gt,
                            Operator::Le => Operator::Ge,
                            other => other,
                        };
                        out.push(BoundaryFn::Compare {
                            op,
                            operand: n.rhs.as_ref().clone(),
                            literal: s.text.clone(),
                        });
                        collect_boundary_fns(&n.rhs, out);
                        return;
                    }
                }
            }
            collect_boundary_fns(&n.lhs, out);
            collect_boundary_fns(&n.rhs, out);
        }
        Node::Boolean(n) => {
            for arg in &n.args {
                collect_boundary_fns(arg, out);
            }
        }
        Node::Unary(n) => collect_boundary_fns(&n.arg, out),
        Node::Tri(n) => {
            let low_dm = matches!(n.args[1].as_ref(), Node::String(s) if is_date_math(&s.text));
            let high_dm = matches!(n.args[2].as_ref(), Node::String(s) if is_date_math(&s.text));
            if low_dm || high_dm {
                out.push(BoundaryFn::Between {
                    subject: n.args[0].as_ref().clone(),
                    low: n.args[1].as_ref().clone(),
                    high: n.args[2].as_ref().clone(),
                });
            }
            for arg in &n.args {
                collect_boundary_fns(arg, out);
            }
        }
        Node::Func(n) => {
            for arg in &n.args {
                collect_boundary_fns(arg, out);
            }
        }
        Node::Array(n) => {
            for arg in &n.args {
                collect_boundary_fns(arg, out);
            }
        }
        Node::Include(inc) => {
            // Assumes includes were resolved beforehand; an unresolved
            // include is simply not a date-math subtree.
            if let Some(referent) = inc.resolved() {
                collect_boundary_fns(referent, out);
            }
        }
        Node::Identity(_) | Node::Number(_) | Node::String(_) | Node::Null | Node::Value(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_is_date_math() {
        assert!(is_date_math("now"));
        assert!(is_date_math("now-3d"));
        assert!(is_date_math("Now+1h"));
        assert!(is_date_math("now-"));
        assert!(!is_date_math("tomorrow"));
        assert!(!is_date_math("2015-12-18"));
    }

    #[test]
    fn test_eval_anchor() {
        let at = anchor();
        assert_eq!(eval_anchor(at, "now").unwrap(), at);
        assert_eq!(eval_anchor(at, "now-3d").unwrap(), at - Duration::days(3));
        assert_eq!(eval_anchor(at, "now+1h").unwrap(), at + Duration::hours(1));
        assert_eq!(eval_anchor(at, "now-1w").unwrap(), at - Duration::weeks(1));
        assert_eq!(eval_anchor(at, "now+30s").unwrap(), at + Duration::seconds(30));
        assert_eq!(eval_anchor(at, "now-5m").unwrap(), at - Duration::minutes(5));
        assert_eq!(
            eval_anchor(at, "now-1M").unwrap(),
            at.checked_sub_months(Months::new(1)).unwrap()
        );
        assert_eq!(
            eval_anchor(at, "now+1y").unwrap(),
            at.checked_add_months(Months::new(12)).unwrap()
        );
        // Compound offsets apply in order.
        assert_eq!(
            eval_anchor(at, "now-1d+1h").unwrap(),
            at - Duration::days(1) + Duration::hours(1)
        );
    }

    #[test]
    fn test_eval_anchor_errors() {
        let at = anchor();
        for bad in ["now-", "now+", "now+now", "now-3x", "now-d", "yesterday"] {
            assert!(eval_anchor(at, bad).is_err(), "should reject {:?}", bad);
        }
    }

    #[test]
    fn test_value_to_time_anchored() {
        let at = anchor();
        assert_eq!(
            value_to_time_anchored(&Value::string("now-1d"), at),
            Some(at - Duration::days(1))
        );
        let plain = value_to_time_anchored(&Value::string("2015-12-18"), at).unwrap();
        assert_eq!(plain, Utc.with_ymd_and_hms(2015, 12, 18, 0, 0, 0).unwrap());
        assert_eq!(value_to_time_anchored(&Value::Time(at), at), Some(at));
        assert_eq!(value_to_time_anchored(&Value::Bool(true), at), None);
    }
}
