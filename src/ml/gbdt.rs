//! Gradient-boosted decision tree classifier
//!
//! Evaluates a multiclass tree ensemble exported with LightGBM's
//! `Booster.dump_model()`. Trees are interleaved by class: tree `i` adds its
//! leaf value to the raw score of class `i % num_class`. Raw scores are turned
//! into probabilities with a softmax (`multiclass`) or an independent sigmoid
//! per class (`multiclassova`).
//!
//! The dump is converted once into flat node arrays; that compiled form is
//! what gets serialized to `.bin` artifacts.

use serde::{Deserialize, Serialize};

use super::SchemaError;

/// How a split treats missing values, mirroring LightGBM's `missing_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingType {
    /// NaN is read as 0.0 and compared normally
    None,
    /// 0.0 (and NaN) follow the default direction
    Zero,
    /// NaN follows the default direction
    NaN,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        default_left: bool,
        missing: MissingType,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree stored in pre-order; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Result<Self, SchemaError> {
        let tree = Self { nodes };
        tree.validate(usize::MAX)?;
        Ok(tree)
    }

    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    /// Depth-one tree: `value <= threshold` goes left.
    pub fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Self {
        Self {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    default_left: true,
                    missing: MissingType::None,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Children must come after their parent so that traversal terminates.
    fn validate(&self, n_features: usize) -> Result<(), SchemaError> {
        if self.nodes.is_empty() {
            return Err(SchemaError::Invalid("tree has no nodes".to_string()));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(SchemaError::Invalid(format!(
                        "node {index} splits on feature {feature}, model has {n_features}"
                    )));
                }
                if threshold.is_nan() {
                    return Err(SchemaError::Invalid(format!("node {index} has a NaN threshold")));
                }
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(SchemaError::Invalid(format!(
                            "node {index} points to invalid child {child}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    default_left,
                    missing,
                    left,
                    right,
                } => {
                    let go_left = decide(row[*feature], *threshold, *default_left, *missing);
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }
}

fn decide(value: f64, threshold: f64, default_left: bool, missing: MissingType) -> bool {
    match missing {
        MissingType::NaN if value.is_nan() => default_left,
        MissingType::Zero if value.is_nan() || value == 0.0 => default_left,
        _ => {
            let value = if value.is_nan() { 0.0 } else { value };
            value <= threshold
        }
    }
}

/// Mapping from raw class scores to probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputTransform {
    /// Probabilities sum to one across classes
    Softmax,
    /// One-vs-all; each class scored independently
    Sigmoid { sigmoid: f64 },
}

impl OutputTransform {
    fn from_objective(objective: &str) -> Result<Self, SchemaError> {
        let mut parts = objective.split_whitespace();
        match parts.next() {
            Some("multiclass" | "softmax") => Ok(OutputTransform::Softmax),
            Some("multiclassova" | "multiclass_ova" | "ova" | "ovr") => {
                let sigmoid = parts
                    .find_map(|p| p.strip_prefix("sigmoid:"))
                    .map(|s| s.parse::<f64>())
                    .transpose()
                    .map_err(|e| SchemaError::Invalid(format!("bad sigmoid in objective: {e}")))?
                    .unwrap_or(1.0);
                Ok(OutputTransform::Sigmoid { sigmoid })
            }
            _ => Err(SchemaError::Invalid(format!(
                "unsupported objective `{objective}`, expected a multiclass model"
            ))),
        }
    }

    fn apply(&self, raw: &[f64]) -> Vec<f64> {
        match self {
            OutputTransform::Softmax => {
                let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let exps: Vec<f64> = raw.iter().map(|r| (r - max).exp()).collect();
                let sum: f64 = exps.iter().sum();
                exps.iter().map(|e| e / sum).collect()
            }
            OutputTransform::Sigmoid { sigmoid } => raw
                .iter()
                .map(|r| 1.0 / (1.0 + (-sigmoid * r).exp()))
                .collect(),
        }
    }
}

/// Multiclass gradient-boosted tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    feature_names: Vec<String>,
    num_class: usize,
    output: OutputTransform,
    /// Random-forest mode: raw scores are averaged over iterations
    average_output: bool,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedClassifier {
    pub fn new(
        feature_names: Vec<String>,
        num_class: usize,
        output: OutputTransform,
        trees: Vec<RegressionTree>,
    ) -> Result<Self, SchemaError> {
        let model = Self {
            feature_names,
            num_class,
            output,
            average_output: false,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn with_average_output(mut self, average_output: bool) -> Self {
        self.average_output = average_output;
        self
    }

    /// Build from the JSON layout of LightGBM's `dump_model()`.
    pub fn from_lightgbm_dump(dump: LightGbmDump) -> Result<Self, SchemaError> {
        let output = OutputTransform::from_objective(&dump.objective)?;
        if let Some(per_iteration) = dump.num_tree_per_iteration {
            if per_iteration != dump.num_class {
                return Err(SchemaError::Invalid(format!(
                    "{per_iteration} trees per iteration for {} classes",
                    dump.num_class
                )));
            }
        }

        let trees = dump
            .tree_info
            .into_iter()
            .map(|info| {
                let mut nodes = Vec::with_capacity(info.num_leaves.unwrap_or(1) * 2);
                flatten(info.tree_structure, &mut nodes)?;
                Ok(RegressionTree { nodes })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        let model = Self::new(dump.feature_names, dump.num_class, output, trees)?;
        Ok(model.with_average_output(dump.average_output))
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.num_class == 0 {
            return Err(SchemaError::Invalid("model declares zero classes".to_string()));
        }
        if self.trees.is_empty() || self.trees.len() % self.num_class != 0 {
            return Err(SchemaError::Invalid(format!(
                "{} trees cannot be split evenly across {} classes",
                self.trees.len(),
                self.num_class
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len())
                .map_err(|e| SchemaError::Invalid(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_class(&self) -> usize {
        self.num_class
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn iterations(&self) -> usize {
        self.trees.len() / self.num_class
    }

    /// Per-class margins before the output transform.
    pub fn raw_scores(&self, row: &[f64]) -> Result<Vec<f64>, SchemaError> {
        if row.len() != self.feature_names.len() {
            return Err(SchemaError::ColumnCount {
                expected: self.feature_names.len(),
                found: row.len(),
            });
        }

        let mut scores = vec![0.0; self.num_class];
        for (i, tree) in self.trees.iter().enumerate() {
            scores[i % self.num_class] += tree.predict(row);
        }
        if self.average_output {
            let iterations = self.iterations() as f64;
            scores.iter_mut().for_each(|s| *s /= iterations);
        }
        Ok(scores)
    }

    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, SchemaError> {
        let raw = self.raw_scores(row)?;
        Ok(self.output.apply(&raw))
    }
}

/// Subset of the LightGBM model dump needed for inference.
#[derive(Debug, Clone, Deserialize)]
pub struct LightGbmDump {
    pub num_class: usize,
    #[serde(default)]
    pub num_tree_per_iteration: Option<usize>,
    pub objective: String,
    #[serde(default)]
    pub average_output: bool,
    pub feature_names: Vec<String>,
    pub tree_info: Vec<LightGbmTreeInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightGbmTreeInfo {
    #[serde(default)]
    pub num_leaves: Option<usize>,
    pub tree_structure: LightGbmNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LightGbmNode {
    Split {
        split_feature: usize,
        threshold: f64,
        #[serde(default = "default_decision_type")]
        decision_type: String,
        #[serde(default = "default_true")]
        default_left: bool,
        #[serde(default = "default_missing_type")]
        missing_type: String,
        left_child: Box<LightGbmNode>,
        right_child: Box<LightGbmNode>,
    },
    Leaf {
        leaf_value: f64,
    },
}

fn default_decision_type() -> String {
    "<=".to_string()
}

fn default_missing_type() -> String {
    "None".to_string()
}

fn default_true() -> bool {
    true
}

fn flatten(node: LightGbmNode, nodes: &mut Vec<TreeNode>) -> Result<usize, SchemaError> {
    let index = nodes.len();
    match node {
        LightGbmNode::Leaf { leaf_value } => nodes.push(TreeNode::Leaf { value: leaf_value }),
        LightGbmNode::Split {
            split_feature,
            threshold,
            decision_type,
            default_left,
            missing_type,
            left_child,
            right_child,
        } => {
            if decision_type != "<=" {
                return Err(SchemaError::Invalid(format!(
                    "unsupported decision type `{decision_type}`; categorical splits are not supported"
                )));
            }
            let missing = match missing_type.as_str() {
                "None" => MissingType::None,
                "Zero" => MissingType::Zero,
                "NaN" => MissingType::NaN,
                other => {
                    return Err(SchemaError::Invalid(format!("unknown missing type `{other}`")))
                }
            };

            // reserve the slot so children land after the parent
            nodes.push(TreeNode::Leaf { value: 0.0 });
            let left = flatten(*left_child, nodes)?;
            let right = flatten(*right_child, nodes)?;
            nodes[index] = TreeNode::Split {
                feature: split_feature,
                threshold,
                default_left,
                missing,
                left,
                right,
            };
        }
    }
    Ok(index)
}
