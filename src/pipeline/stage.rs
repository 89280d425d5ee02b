// ABOUTME: Named pipeline stages in execution order.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    BeforePackageExtraction,
    PackageExtraction,
    AfterPackageExtraction,
    PreDeploy,
    Deploy,
    PostDeploy,
    /// Runs once, only after another stage failed.
    DeployFailed,
}

impl Stage {
    /// Stages of a normal run, in order. Excludes [`Stage::DeployFailed`].
    pub const SEQUENCE: [Stage; 6] = [
        Stage::BeforePackageExtraction,
        Stage::PackageExtraction,
        Stage::AfterPackageExtraction,
        Stage::PreDeploy,
        Stage::Deploy,
        Stage::PostDeploy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::BeforePackageExtraction => "BeforePackageExtraction",
            Stage::PackageExtraction => "PackageExtraction",
            Stage::AfterPackageExtraction => "AfterPackageExtraction",
            Stage::PreDeploy => "PreDeploy",
            Stage::Deploy => "Deploy",
            Stage::PostDeploy => "PostDeploy",
            Stage::DeployFailed => "DeployFailed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
