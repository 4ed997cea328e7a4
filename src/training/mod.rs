//! Model training module
//!
//! Candidate regressors and the trainer that selects among them:
//! - Random Forest and Decision Tree (CART, squared error)
//! - Ordinary least squares
//! - Epsilon-SVR with an RBF kernel
//! - XGBoost-style gradient boosting

mod config;
mod engine;
mod models;
pub mod decision_tree;
pub mod linear_models;
pub mod random_forest;
pub mod svm;
pub mod xgboost;

pub use config::TrainerConfig;
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use engine::{split_features_target, EvaluationReport, ModelTrainer, TrainingOutcome};
pub use linear_models::LinearRegression;
pub use models::{
    default_candidates, ensure_unique_names, r2_score, Candidate, ModelMetrics, RegressionModel,
    Regressor,
};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use svm::{Gamma, KernelType, SVMConfig, SVMRegressor};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};
