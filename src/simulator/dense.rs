//! Dense output over the accepted steps of a run.
//!
//! Every accepted step end point is stored with the state and the derivative there,
//! which is enough for a cubic Hermite interpolant on each step. The interpolant
//! reproduces the recorded states exactly at the nodes.

use crate::structs::compartments::State;

/// End point of one accepted step
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Node {
    pub t: f64,
    pub y: State,
    pub dy: State,
}

/// Accepted steps of a run, in increasing time order
#[derive(Debug, Clone, Default)]
pub(crate) struct StepLog {
    nodes: Vec<Node>,
}

impl StepLog {
    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn last(&self) -> Option<&Node> {
        self.nodes.last()
    }

    /// Number of steps taken after the initial node
    pub fn steps(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Pin the time of the last node to `t`
    ///
    /// The final step lands on the end of the span up to rounding; pinning it keeps the
    /// reported span exact.
    pub fn pin_last(&mut self, t: f64) {
        if let Some(node) = self.nodes.last_mut() {
            node.t = t;
        }
    }

    /// Solution at `t`, or `None` when `t` lies outside the recorded steps
    pub fn evaluate(&self, t: f64) -> Option<State> {
        let k = self.nodes.partition_point(|node| node.t < t);
        let right = self.nodes.get(k)?;
        if right.t == t {
            return Some(right.y);
        }
        let left = self.nodes.get(k.checked_sub(1)?)?;
        Some(hermite(left, right, t))
    }
}

/// Cubic Hermite interpolation between two step end points
fn hermite(a: &Node, b: &Node, t: f64) -> State {
    let h = b.t - a.t;
    let s = (t - a.t) / h;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    a.y * h00 + a.dy * (h * h10) + b.y * h01 + b.dy * (h * h11)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn node(t: f64, f: impl Fn(f64) -> f64, df: impl Fn(f64) -> f64) -> Node {
        Node {
            t,
            y: State::from_element(f(t)),
            dy: State::from_element(df(t)),
        }
    }

    #[test]
    fn test_exact_for_cubics() {
        let f = |t: f64| t * t * t - 2.0 * t + 1.0;
        let df = |t: f64| 3.0 * t * t - 2.0;

        let mut log = StepLog::default();
        log.push(node(0.0, f, df));
        log.push(node(1.5, f, df));
        log.push(node(4.0, f, df));

        for t in [0.0, 0.3, 1.5, 2.2, 3.9, 4.0] {
            let y = log.evaluate(t).unwrap();
            assert_relative_eq!(y[0], f(t), max_relative = 1e-12, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_outside_the_log() {
        let f = |t: f64| t;
        let df = |_t: f64| 1.0;

        let mut log = StepLog::default();
        assert!(log.evaluate(0.0).is_none());

        log.push(node(1.0, f, df));
        log.push(node(2.0, f, df));
        assert!(log.evaluate(0.5).is_none());
        assert!(log.evaluate(2.5).is_none());
        assert_eq!(log.evaluate(1.0).unwrap()[3], 1.0);
        assert_eq!(log.steps(), 1);
    }

    #[test]
    fn test_pin_last() {
        let f = |t: f64| 2.0 * t;
        let df = |_t: f64| 2.0;

        let mut log = StepLog::default();
        log.push(node(0.0, f, df));
        log.push(node(0.999_999_999_999_999_9, f, df));
        log.pin_last(1.0);
        assert_eq!(log.last().unwrap().t, 1.0);
        assert!(log.evaluate(1.0).is_some());
    }
}
