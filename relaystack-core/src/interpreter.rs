//! Interpreter - execute a Plan's Effects through an Engine
//!
//! The Interpreter walks the Plan in order, handing each Effect to the
//! engine and collecting the results. This is where side effects actually
//! occur; everything before this point is pure description.

use tracing::info;

use crate::effect::Effect;
use crate::engine::{Engine, EngineError, EngineResult};
use crate::plan::Plan;
use crate::resource::State;

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Read succeeded
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete succeeded
    Deleted,
    /// Grant succeeded
    Granted,
    /// Revoke succeeded
    Revoked,
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, EngineError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using an Engine
pub struct Interpreter<E: Engine> {
    engine: E,
    config: InterpreterConfig,
}

impl<E: Engine> Interpreter<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// The engine this interpreter executes against
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(&self, plan: &Plan) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            let result = self.execute_effect(effect).await;

            match &result {
                Ok(_) => {
                    info!(engine = self.engine.name(), effect = %effect.describe(), "applied");
                    success_count += 1;
                }
                Err(_) => {
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(&self, effect: &Effect) -> EngineResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Read(resource) => {
                let state = self.engine.read(&resource.id, None).await?;
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let state = self.engine.create(resource).await?;
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to } => {
                let state = self.engine.update(id, from, to).await?;
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Delete(id) => {
                self.engine.delete(id, None).await?;
                Ok(EffectOutcome::Deleted)
            }
            Effect::Grant(grant) => {
                self.engine.grant(grant).await?;
                Ok(EffectOutcome::Granted)
            }
            Effect::Revoke(grant) => {
                self.engine.revoke(grant).await?;
                Ok(EffectOutcome::Revoked)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BoxFuture;
    use crate::resource::{Access, PermissionGrant, Resource, ResourceId};

    struct TestEngine {
        fail_on_create: bool,
    }

    impl Engine for TestEngine {
        fn name(&self) -> &'static str {
            "test"
        }

        fn read(
            &self,
            id: &ResourceId,
            _identifier: Option<&str>,
        ) -> BoxFuture<'_, EngineResult<State>> {
            let id = id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, EngineResult<State>> {
            if self.fail_on_create {
                let id = resource.id.clone();
                return Box::pin(async move {
                    Err(EngineError::new("quota exceeded").for_resource(id))
                });
            }
            let state = State::existing(resource.id.clone(), resource.attributes.clone())
                .with_identifier("test-id");
            Box::pin(async move { Ok(state) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, EngineResult<State>> {
            let state = State::existing(id.clone(), to.attributes.clone());
            Box::pin(async move { Ok(state) })
        }

        fn delete(
            &self,
            _id: &ResourceId,
            _identifier: Option<&str>,
        ) -> BoxFuture<'_, EngineResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn grant(&self, _grant: &PermissionGrant) -> BoxFuture<'_, EngineResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn revoke(&self, _grant: &PermissionGrant) -> BoxFuture<'_, EngineResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn apply_empty_plan() {
        let interpreter = Interpreter::new(TestEngine {
            fail_on_create: false,
        });
        let plan = Plan::new();
        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 0);
    }

    #[tokio::test]
    async fn apply_create_and_grant() {
        let interpreter = Interpreter::new(TestEngine {
            fail_on_create: false,
        });
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("table", "flags-table")));
        plan.add(Effect::Grant(PermissionGrant::new(
            "relay-service",
            "flags-table",
            Access::ReadWrite,
        )));

        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 2);
        assert!(matches!(result.outcomes[1], Ok(EffectOutcome::Granted)));
    }

    #[tokio::test]
    async fn failure_stops_execution_by_default() {
        let interpreter = Interpreter::new(TestEngine {
            fail_on_create: true,
        });
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("table", "flags-table")));
        plan.add(Effect::Create(Resource::new("service", "relay-service")));

        let result = interpreter.apply(&plan).await;

        assert!(!result.is_success());
        assert_eq!(result.outcomes.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_skips_effects() {
        let config = InterpreterConfig {
            dry_run: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(TestEngine {
            fail_on_create: true,
        })
        .with_config(config);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("table", "flags-table")));

        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert!(matches!(
            result.outcomes[0],
            Ok(EffectOutcome::Skipped { .. })
        ));
    }
}
