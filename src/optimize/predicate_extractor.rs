use sqlparser::ast::{BinaryOperator, Expr, Query, Select, SetExpr, Visit, Visitor};
use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::{debug, trace};

use super::OptimizeContext;
use super::assembler::ShardingConditionAssembler;
use super::route_value_builder::{PredicateRightValue, RouteValueBuilder};
use crate::route::{RouteValue, ShardingCondition, ShardingConditions};
use crate::statement::{ColumnRef, TablesContext};
use crate::types::SqlValue;
use crate::{Result, ShardingError};

/// Upper bound on the AND-groups one WHERE segment may expand into.
/// Larger expansions give up and route to every node.
pub const MAX_AND_GROUPS: usize = 256;

/// Tables of one enclosing query scope. `narrowed` is set when the scope's own
/// WHERE produced sharding conditions; correlated predicates may only bind to
/// tables of narrowed scopes.
#[derive(Debug, Clone)]
struct Scope {
    tables: TablesContext,
    narrowed: bool,
}

/// Binds predicate columns against a query's own tables, then its enclosing scopes
struct ColumnBinder<'s> {
    own: &'s TablesContext,
    enclosing: &'s [Scope],
}

impl ColumnBinder<'_> {
    fn bind(&self, column: &ColumnRef, context: &OptimizeContext<'_>) -> Option<String> {
        let metadata = context.metadata();
        if let Some(table) = self.own.find_table_name(column, metadata) {
            return Some(table);
        }
        // An unqualified column the own tables cannot place stays unresolved
        if column.owner.is_none() && !self.own.tables().is_empty() {
            return None;
        }
        for scope in self.enclosing.iter().rev() {
            if let Some(table) = scope.tables.find_table_name(column, metadata) {
                if scope.narrowed {
                    return Some(table);
                }
                debug!(
                    "Correlated column {} binds to {} whose scope is not narrowed, skipping predicate",
                    column.name, table
                );
                return None;
            }
        }
        None
    }
}

/// Collects sharding conditions from the WHERE clauses of a statement and its subqueries
pub struct PredicateExtractor<'a> {
    context: OptimizeContext<'a>,
    parameters: &'a [SqlValue],
}

impl<'a> PredicateExtractor<'a> {
    pub fn new(context: OptimizeContext<'a>, parameters: &'a [SqlValue]) -> Self {
        Self { context, parameters }
    }

    /// Route values of each OR-branch of a predicate tree bound against `tables`.
    ///
    /// `a AND (b OR c)` becomes `[route(a) + route(b), route(a) + route(c)]`; parentheses
    /// are transparent. A branch without route values absorbs its whole disjunction into
    /// a single empty group. `None` when the expansion exceeds [`MAX_AND_GROUPS`].
    pub fn route_groups(&self, selection: &Expr, tables: &TablesContext) -> Result<Option<Vec<Vec<RouteValue>>>> {
        self.groups(selection, &ColumnBinder { own: tables, enclosing: &[] })
    }

    fn groups(&self, expr: &Expr, binder: &ColumnBinder<'_>) -> Result<Option<Vec<Vec<RouteValue>>>> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } => {
                let Some(left) = self.groups(left, binder)? else {
                    return Ok(None);
                };
                if Self::is_unconstrained(&left) {
                    trace!("OR-branch without sharding predicate, skipping the rest of the disjunction");
                    return Ok(Some(left));
                }
                let Some(right) = self.groups(right, binder)? else {
                    return Ok(None);
                };
                if Self::is_unconstrained(&right) {
                    return Ok(Some(right));
                }
                if left.len() + right.len() > MAX_AND_GROUPS {
                    debug!("OR expansion exceeds {} AND-groups, giving up on pruning", MAX_AND_GROUPS);
                    return Ok(None);
                }
                let mut groups = left;
                groups.extend(right);
                Ok(Some(groups))
            }
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let Some(left) = self.groups(left, binder)? else {
                    return Ok(None);
                };
                let Some(right) = self.groups(right, binder)? else {
                    return Ok(None);
                };
                if Self::is_unconstrained(&left) {
                    return Ok(Some(right));
                }
                if Self::is_unconstrained(&right) {
                    return Ok(Some(left));
                }
                if left.len().saturating_mul(right.len()) > MAX_AND_GROUPS {
                    debug!("AND expansion exceeds {} AND-groups, giving up on pruning", MAX_AND_GROUPS);
                    return Ok(None);
                }
                let mut groups = Vec::with_capacity(left.len() * right.len());
                for l in &left {
                    for r in &right {
                        let mut group = l.clone();
                        group.extend(r.iter().cloned());
                        groups.push(group);
                    }
                }
                Ok(Some(groups))
            }
            Expr::Nested(inner) => self.groups(inner, binder),
            predicate => Ok(Some(vec![self.route_value(predicate, binder)?.into_iter().collect()])),
        }
    }

    // Invariant: a group list holding an empty group is exactly `[[]]`
    fn is_unconstrained(groups: &[Vec<RouteValue>]) -> bool {
        groups.iter().any(Vec::is_empty)
    }

    /// Conditions of one WHERE segment, voided when some AND-group has no sharding predicate
    pub fn segment_conditions(&self, selection: &Expr, tables: &TablesContext) -> Result<Vec<ShardingCondition>> {
        self.bound_segment_conditions(selection, &ColumnBinder { own: tables, enclosing: &[] })
    }

    fn bound_segment_conditions(&self, selection: &Expr, binder: &ColumnBinder<'_>) -> Result<Vec<ShardingCondition>> {
        match self.groups(selection, binder)? {
            Some(groups) => {
                trace!("WHERE segment has {} AND-group(s)", groups.len());
                Ok(ShardingConditionAssembler::assemble(groups))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Conditions of a query: its own WHERE clauses first, then every nested query scope
    /// (subqueries, derived tables, set operation branches, CTEs) in textual order.
    pub fn extract_query(&self, query: &Query) -> Result<ShardingConditions> {
        let mut collector = ScopeCollector::new(self, Vec::new());
        if let ControlFlow::Break(err) = query.visit(&mut collector) {
            return Err(err);
        }
        Ok(ShardingConditions::new(collector.conditions))
    }

    /// Conditions of an UPDATE or DELETE: the statement's own WHERE segment, then the
    /// subqueries it contains, bound against `tables` where they are correlated.
    pub fn extract_where(&self, tables: TablesContext, selection: Option<&Expr>) -> Result<ShardingConditions> {
        let Some(selection) = selection else {
            return Ok(ShardingConditions::empty());
        };
        let top = self.segment_conditions(selection, &tables)?;
        let scope = Scope {
            tables,
            narrowed: !top.is_empty(),
        };
        let mut collector = ScopeCollector::new(self, vec![scope]);
        collector.append(top);
        if let ControlFlow::Break(err) = selection.visit(&mut collector) {
            return Err(err);
        }
        Ok(ShardingConditions::new(collector.conditions))
    }

    fn route_value(&self, predicate: &Expr, binder: &ColumnBinder<'_>) -> Result<Option<RouteValue>> {
        let Some((column, right_value)) = PredicateRightValue::from_predicate(predicate) else {
            trace!("Predicate is not a route value source: {}", predicate);
            return Ok(None);
        };
        let Some(table) = binder.bind(&column, &self.context) else {
            debug!("Cannot bind column {} to a table, skipping predicate", column.name);
            return Ok(None);
        };
        if !self.context.sharding_rule().is_sharding_column(&column.name, &table) {
            trace!("{}.{} is not a sharding column", table, column.name);
            return Ok(None);
        }
        RouteValueBuilder::build(&column.name, &table, &right_value, self.parameters)
    }
}

/// Walks nested queries, keeping a stack of the query scopes entered so far
struct ScopeCollector<'e, 'a> {
    extractor: &'e PredicateExtractor<'a>,
    scopes: Vec<Scope>,
    conditions: Vec<ShardingCondition>,
    seen: HashSet<ShardingCondition>,
}

impl<'e, 'a> ScopeCollector<'e, 'a> {
    fn new(extractor: &'e PredicateExtractor<'a>, scopes: Vec<Scope>) -> Self {
        Self {
            extractor,
            scopes,
            conditions: Vec::new(),
            seen: HashSet::new(),
        }
    }

    // Conditions already produced by an enclosing scope are not repeated
    fn append(&mut self, segment: Vec<ShardingCondition>) {
        for condition in segment {
            if self.seen.insert(condition.clone()) {
                self.conditions.push(condition);
            }
        }
    }

    fn collect_selects<'q>(body: &'q SetExpr, selects: &mut Vec<&'q Select>) {
        match body {
            SetExpr::Select(select) => selects.push(select),
            SetExpr::SetOperation { left, right, .. } => {
                Self::collect_selects(left, selects);
                Self::collect_selects(right, selects);
            }
            // Parenthesized queries are scopes of their own and get visited separately
            _ => {}
        }
    }

    fn visit_scope(&mut self, query: &Query) -> Result<()> {
        let mut selects = Vec::new();
        Self::collect_selects(&query.body, &mut selects);

        let mut query_scope = TablesContext::new();
        let mut narrowed = !selects.is_empty();
        let mut segments = Vec::with_capacity(selects.len());
        for select in &selects {
            let tables = TablesContext::from_relations(&select.from);
            query_scope.merge(&tables);
            let Some(selection) = &select.selection else {
                narrowed = false;
                continue;
            };
            let binder = ColumnBinder {
                own: &tables,
                enclosing: &self.scopes,
            };
            let segment = self.extractor.bound_segment_conditions(selection, &binder)?;
            narrowed &= !segment.is_empty();
            segments.push(segment);
        }
        for segment in segments {
            self.append(segment);
        }
        self.scopes.push(Scope {
            tables: query_scope,
            narrowed,
        });
        Ok(())
    }
}

impl Visitor for ScopeCollector<'_, '_> {
    type Break = ShardingError;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        match self.visit_scope(query) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(err),
        }
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.scopes.pop();
        ControlFlow::Continue(())
    }
}
