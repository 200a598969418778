//! Solver-neutral linear program.
//!
//! Every variable is a non-negative continuous value identified by a
//! [`VariableId`]. Constraints are grouped into named families so a model
//! keeps its structure (e.g. one balance equation per time step) while the
//! solver only ever sees the flattened list.

use itertools::Itertools;
use serde::Serialize;
use strum::Display;

use super::OptimizerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VariableId(usize);

impl VariableId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// `Σ coefficient * variable + constant`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinearExpr {
    terms: Vec<(VariableId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(mut self, var: VariableId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    pub fn plus(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    pub fn add_term(&mut self, var: VariableId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn terms(&self) -> &[(VariableId, f64)] {
        &self.terms
    }

    pub fn offset(&self) -> f64 {
        self.constant
    }

    /// Evaluate against values indexed by [`VariableId::index`].
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * values[var.index()])
            .sum::<f64>()
            + self.constant
    }

    /// Merge repeated variables and drop zero coefficients.
    pub fn simplified(&self) -> Self {
        let terms = self
            .terms
            .iter()
            .copied()
            .sorted_by_key(|(var, _)| *var)
            .coalesce(|(a, ca), (b, cb)| {
                if a == b {
                    Ok((a, ca + cb))
                } else {
                    Err(((a, ca), (b, cb)))
                }
            })
            .filter(|(_, coefficient)| *coefficient != 0.0)
            .collect();
        Self {
            terms,
            constant: self.constant,
        }
    }
}

impl FromIterator<(VariableId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VariableId, f64)>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
            constant: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum Relation {
    #[strum(to_string = "<=")]
    LessOrEqual,
    #[strum(to_string = "==")]
    Equal,
    #[strum(to_string = ">=")]
    GreaterOrEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn leq(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self::new(name, expr, Relation::LessOrEqual, rhs)
    }

    pub fn equal(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self::new(name, expr, Relation::Equal, rhs)
    }

    pub fn geq(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self::new(name, expr, Relation::GreaterOrEqual, rhs)
    }

    fn new(name: impl Into<String>, expr: LinearExpr, relation: Relation, rhs: f64) -> Self {
        Self {
            name: name.into(),
            expr,
            relation,
            rhs,
        }
    }

    /// How far `values` fall outside the constraint; zero when satisfied.
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.eval(values);
        match self.relation {
            Relation::LessOrEqual => (lhs - self.rhs).max(0.0),
            Relation::Equal => (lhs - self.rhs).abs(),
            Relation::GreaterOrEqual => (self.rhs - lhs).max(0.0),
        }
    }
}

impl std::fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.name)?;
        for (i, (var, coefficient)) in self.expr.terms().iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{coefficient}*x{}", var.index())?;
        }
        if self.expr.offset() != 0.0 {
            write!(f, " + {}", self.expr.offset())?;
        }
        write!(f, " {} {}", self.relation, self.rhs)
    }
}

/// Named group of constraints sharing one role in the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintFamily {
    pub name: String,
    pub constraints: Vec<LinearConstraint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearProgram {
    variables: Vec<String>,
    sense: Sense,
    objective: LinearExpr,
    families: Vec<ConstraintFamily>,
}

impl LinearProgram {
    pub fn new(sense: Sense) -> Self {
        Self {
            variables: Vec::new(),
            sense,
            objective: LinearExpr::new(),
            families: Vec::new(),
        }
    }

    /// Add a non-negative continuous variable.
    pub fn add_variable(&mut self, name: impl Into<String>) -> VariableId {
        self.variables.push(name.into());
        VariableId(self.variables.len() - 1)
    }

    /// Add `n` variables named `prefix[0]` .. `prefix[n-1]`.
    pub fn add_indexed_variables(&mut self, prefix: &str, n: usize) -> Vec<VariableId> {
        (0..n).map(|t| self.add_variable(format!("{prefix}[{t}]"))).collect()
    }

    pub fn set_objective(&mut self, objective: LinearExpr) -> Result<(), OptimizerError> {
        self.check_expr("objective", &objective)?;
        self.objective = objective;
        Ok(())
    }

    /// Append a constraint to `family`, creating the family on first use.
    pub fn add_constraint(
        &mut self,
        family: &str,
        constraint: LinearConstraint,
    ) -> Result<(), OptimizerError> {
        self.check_expr(&constraint.name, &constraint.expr)?;
        if !constraint.rhs.is_finite() {
            return Err(OptimizerError::Configuration(format!(
                "constraint {} has a non-finite right-hand side",
                constraint.name
            )));
        }

        match self.families.iter_mut().find(|f| f.name == family) {
            Some(existing) => existing.constraints.push(constraint),
            None => self.families.push(ConstraintFamily {
                name: family.to_string(),
                constraints: vec![constraint],
            }),
        }
        Ok(())
    }

    fn check_expr(&self, context: &str, expr: &LinearExpr) -> Result<(), OptimizerError> {
        for (var, coefficient) in expr.terms() {
            if var.index() >= self.variables.len() {
                return Err(OptimizerError::Configuration(format!(
                    "{context} refers to unknown variable x{}",
                    var.index()
                )));
            }
            if !coefficient.is_finite() {
                return Err(OptimizerError::Configuration(format!(
                    "{context} has a non-finite coefficient on {}",
                    self.variables[var.index()]
                )));
            }
        }
        Ok(())
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variables
    }

    pub fn variable_name(&self, var: VariableId) -> &str {
        &self.variables[var.index()]
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn families(&self) -> &[ConstraintFamily] {
        &self.families
    }

    pub fn family(&self, name: &str) -> Option<&ConstraintFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// All constraints of all families, in insertion order.
    pub fn constraints(&self) -> impl Iterator<Item = &LinearConstraint> {
        self.families.iter().flat_map(|f| f.constraints.iter())
    }

    pub fn num_constraints(&self) -> usize {
        self.families.iter().map(|f| f.constraints.len()).sum()
    }

    /// First constraint (or negative variable) violated by more than `tolerance`.
    pub fn first_violation(&self, values: &[f64], tolerance: f64) -> Option<String> {
        if values.len() != self.variables.len() {
            return Some(format!(
                "expected {} values, got {}",
                self.variables.len(),
                values.len()
            ));
        }
        if let Some((i, value)) = values.iter().enumerate().find(|(_, v)| **v < -tolerance) {
            return Some(format!("{} = {value} is negative", self.variables[i]));
        }
        self.constraints()
            .find(|c| c.violation(values) > tolerance)
            .map(|c| format!("{c} violated by {}", c.violation(values)))
    }
}
