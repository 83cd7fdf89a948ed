//! Deterministic Simulation Testing for the request pipeline.
//!
//! Shadow-state harness that drives the key grammar, alias table and command
//! templater with seeded random inputs:
//! - Random keys are serialized and parsed back
//! - Random alias tables are reloaded and queried
//! - Random templates and parameters are substituted
//! - Random parameters are run through the deny-set
//!
//! Each real result is compared with a deliberately simple shadow model.
//! The real implementation must match the shadow model for all seeds.

use crate::alias::AliasResolver;
use crate::io::{Rng, SimulatedRng};
use crate::key::{make_key, parse_key};
use crate::userparam::{BindingTable, SafetyPolicy, DENIED_CHARACTERS};

/// Configuration for request DST
#[derive(Debug, Clone)]
pub struct RequestDSTConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of operations per run
    pub num_operations: usize,
    /// Number of distinct key names
    pub name_pool_size: usize,
    /// Maximum parameters in a generated key
    pub max_params: usize,
    /// Maximum rules in a generated alias table
    pub max_rules: usize,
}

impl Default for RequestDSTConfig {
    fn default() -> Self {
        RequestDSTConfig {
            seed: 0,
            num_operations: 500,
            name_pool_size: 6,
            max_params: 4,
            max_rules: 8,
        }
    }
}

impl RequestDSTConfig {
    pub fn new(seed: u64) -> Self {
        RequestDSTConfig {
            seed,
            ..Default::default()
        }
    }

    /// Few names, many rules (lots of pattern collisions)
    pub fn dense_aliases(seed: u64) -> Self {
        RequestDSTConfig {
            seed,
            name_pool_size: 3,
            max_rules: 12,
            ..Default::default()
        }
    }

    /// Long parameter lists
    pub fn wide_keys(seed: u64) -> Self {
        RequestDSTConfig {
            seed,
            max_params: 12,
            ..Default::default()
        }
    }
}

/// Characters used for generated parameter values
const PARAM_ALPHABET: &[char] = &[
    'a', 'b', 'z', '0', '9', ' ', ',', '[', ']', '"', '\\', '$', '/', '.', '-', 'ü',
];

/// Characters used for deny-set probes
const PROBE_ALPHABET: &[char] = &[
    'a', 'Z', '5', ' ', '/', '.', '-', '_', ',', ':', '=', '%', 'é', '\\', '\'', '"', '`', '*',
    '?', '[', ']', '{', '}', '~', '$', '!', '&', ';', '(', ')', '<', '>', '|', '#', '@', '\n',
];

/// Template building blocks
const TEMPLATE_PARTS: &[&str] = &[
    "$1", "$2", "$3", "$5", "$9", "$0", "$$", "$", "echo ", "x", "'", " | ", "ü",
];

/// Parameter values for template substitution
const TEMPLATE_PARAMS: &[&str] = &["a", "b c", "$1", "$$", "$2x", "", "/tmp", "ö"];

/// Operation types for logging
#[derive(Debug, Clone)]
pub enum RequestOp {
    RoundTrip { name: String, params: Vec<String> },
    ReloadAliases { rules: Vec<String> },
    Resolve { request: String },
    Substitute { template: String, params: Vec<String> },
    DenyCheck { param: String },
}

/// Result of a request DST run
#[derive(Debug, Clone)]
pub struct RequestDSTResult {
    pub seed: u64,
    pub total_operations: u64,
    pub round_trips: u64,
    pub reloads: u64,
    pub resolves: u64,
    pub substitutions: u64,
    pub deny_checks: u64,
    pub invariant_violations: Vec<String>,
    pub last_op: Option<RequestOp>,
}

impl RequestDSTResult {
    fn new(seed: u64) -> Self {
        RequestDSTResult {
            seed,
            total_operations: 0,
            round_trips: 0,
            reloads: 0,
            resolves: 0,
            substitutions: 0,
            deny_checks: 0,
            invariant_violations: Vec::new(),
            last_op: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} ops (round_trip:{}, reload:{}, resolve:{}, substitute:{}, deny:{}), {} violations",
            self.seed,
            self.total_operations,
            self.round_trips,
            self.reloads,
            self.resolves,
            self.substitutions,
            self.deny_checks,
            self.invariant_violations.len()
        )
    }
}

/// Shadow alias model: ordered `(pattern, target)` list, linear scans only
#[derive(Debug, Clone, Default)]
struct ShadowAliases {
    rules: Vec<(String, String)>,
}

impl ShadowAliases {
    fn bracket_is_wildcard(text: &str) -> Option<&str> {
        let open = text.find('[')?;
        let inner = text[open + 1..].strip_suffix(']')?;
        (inner.trim_start_matches(' ') == "*").then(|| &text[..open])
    }

    fn resolve(&self, request: &str) -> String {
        let mut resolved = None;

        for (pattern, target) in &self.rules {
            if pattern == request {
                resolved = Some(target.clone());
                break;
            }
        }

        if resolved.is_none() {
            if let Some(open) = request.find('[').filter(|&o| o > 0) {
                let base = &request[..open];
                for (pattern, target) in &self.rules {
                    if Self::bracket_is_wildcard(pattern) != Some(base) {
                        continue;
                    }
                    resolved = Some(match Self::bracket_is_wildcard(target) {
                        Some(target_name) => format!("{}{}", target_name, &request[open..]),
                        None => target.clone(),
                    });
                    break;
                }
            }
        }

        resolved.unwrap_or_else(|| request.to_string())
    }
}

/// Shadow substitution: char iterator, no byte offsets
fn shadow_substitute(template: &str, params: &[String]) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(&d) = chars.peek() {
                if ('1'..='9').contains(&d) {
                    chars.next();
                    let index = d as usize - '1' as usize;
                    match params.get(index) {
                        Some(p) => out.push_str(p),
                        None => {
                            out.push('$');
                            out.push(d);
                        }
                    }
                    continue;
                }
            }
        }
        out.push(c);
    }

    out
}

/// DST harness for the request pipeline
pub struct RequestDSTHarness {
    config: RequestDSTConfig,
    rng: SimulatedRng,
    /// The real resolver under test
    aliases: AliasResolver,
    /// Shadow alias state
    shadow: ShadowAliases,
    /// Bindings for deny-set probes under both policies
    restrictive: BindingTable,
    permissive: BindingTable,
    result: RequestDSTResult,
    name_pool: Vec<String>,
}

impl RequestDSTHarness {
    pub fn new(config: RequestDSTConfig) -> Self {
        let rng = SimulatedRng::new(config.seed);
        let name_pool = (0..config.name_pool_size.max(1))
            .map(|i| format!("key{}.n", i))
            .collect();

        RequestDSTHarness {
            result: RequestDSTResult::new(config.seed),
            config,
            rng,
            aliases: AliasResolver::empty(),
            shadow: ShadowAliases::default(),
            restrictive: Self::probe_table(SafetyPolicy::Restrictive),
            permissive: Self::probe_table(SafetyPolicy::AllowUnsafe),
            name_pool,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(RequestDSTConfig::new(seed))
    }

    fn probe_table(policy: SafetyPolicy) -> BindingTable {
        let mut table = BindingTable::new(policy);
        let bound = table.bind("probe[*]", "echo $1");
        debug_assert!(bound.is_ok(), "probe binding must be valid");
        table
    }

    fn random_name(&mut self) -> String {
        self.rng.choose(&self.name_pool).cloned().unwrap_or_default()
    }

    fn random_string(&mut self, alphabet: &[char], max_len: u64) -> String {
        let len = self.rng.gen_range(0, max_len + 1);
        (0..len)
            .map(|_| alphabet[self.rng.gen_range(0, alphabet.len() as u64) as usize])
            .collect()
    }

    fn random_param(&mut self) -> String {
        let mut param = self.random_string(PARAM_ALPHABET, 6);
        // A quoted value cannot end in a backslash: it would escape the
        // closing quote
        if param.ends_with('\\') {
            param.push('x');
        }
        param
    }

    fn random_bracket(&mut self) -> String {
        match self.rng.gen_range(0, 5) {
            0 => "[*]".to_string(),
            1 => "[ *]".to_string(),
            2 => "[a]".to_string(),
            3 => "[]".to_string(),
            _ => "[a,b]".to_string(),
        }
    }

    fn random_rules(&mut self) -> Vec<String> {
        let count = self.rng.gen_range(0, self.config.max_rules as u64 + 1);
        let mut patterns = Vec::new();
        let mut rules = Vec::new();

        for _ in 0..count {
            let mut pattern = self.random_name();
            if self.rng.gen_bool(0.6) {
                let bracket = self.random_bracket();
                pattern.push_str(&bracket);
            }
            // Duplicate patterns are a load error; keep generated tables valid
            if patterns.contains(&pattern) {
                continue;
            }

            let mut target = format!("t{}", self.random_name());
            match self.rng.gen_range(0, 3) {
                0 => target.push_str("[*]"),
                1 => target.push_str("[x]"),
                _ => {}
            }

            rules.push(format!("{}:{}", pattern, target));
            patterns.push(pattern);
        }

        // Declaration order decides between wildcard rules with one name
        self.rng.shuffle(&mut rules);
        rules
    }

    fn random_request(&mut self) -> String {
        let mut request = if self.rng.gen_bool(0.9) {
            self.random_name()
        } else {
            "unknown.key".to_string()
        };
        match self.rng.gen_range(0, 4) {
            0 => {}
            1 => {
                let bracket = self.random_bracket();
                request.push_str(&bracket);
            }
            2 => request.push_str("[/tmp, x]"),
            _ => request.push_str("[*]"),
        }
        request
    }

    fn run_single_op(&mut self) {
        let op_type = self.rng.gen_range(0, 100);

        if op_type < 35 {
            self.op_round_trip();
        } else if op_type < 40 {
            self.op_reload_aliases();
        } else if op_type < 65 {
            self.op_resolve();
        } else if op_type < 85 {
            self.op_substitute();
        } else {
            self.op_deny_check();
        }

        self.result.total_operations += 1;
    }

    fn violation(&mut self, message: String) {
        self.result.invariant_violations.push(format!(
            "Op #{}: {:?} - {}",
            self.result.total_operations, self.result.last_op, message
        ));
    }

    fn op_round_trip(&mut self) {
        let name = self.random_name();
        let count = self.rng.gen_range(0, self.config.max_params as u64 + 1);
        let params: Vec<String> = (0..count).map(|_| self.random_param()).collect();

        self.result.last_op = Some(RequestOp::RoundTrip {
            name: name.clone(),
            params: params.clone(),
        });
        self.result.round_trips += 1;

        let text = make_key(&name, &params);
        match parse_key(&text) {
            Ok(key) => {
                if key.name() != name || key.params() != params.as_slice() {
                    self.violation(format!(
                        "round trip of '{}' gave name={:?} params={:?}",
                        text,
                        key.name(),
                        key.params()
                    ));
                } else if key.to_key_string() != text {
                    self.violation(format!(
                        "serialization of '{}' is not a fixed point: '{}'",
                        text,
                        key.to_key_string()
                    ));
                }
            }
            Err(e) => self.violation(format!("serialized key '{}' does not parse: {}", text, e)),
        }
    }

    fn op_reload_aliases(&mut self) {
        let rules = self.random_rules();

        self.result.last_op = Some(RequestOp::ReloadAliases {
            rules: rules.clone(),
        });
        self.result.reloads += 1;

        match self.aliases.reload(&rules) {
            Ok(()) => {
                self.shadow.rules = rules
                    .iter()
                    .filter_map(|r| r.split_once(':'))
                    .map(|(p, t)| (p.to_string(), t.to_string()))
                    .collect();
            }
            Err(e) => self.violation(format!("generated rules {:?} rejected: {}", rules, e)),
        }
    }

    fn op_resolve(&mut self) {
        let request = self.random_request();

        self.result.last_op = Some(RequestOp::Resolve {
            request: request.clone(),
        });
        self.result.resolves += 1;

        let real = self.aliases.resolve(&request).into_owned();
        let expected = self.shadow.resolve(&request);
        if real != expected {
            self.violation(format!(
                "resolve '{}': shadow='{}', real='{}'",
                request, expected, real
            ));
        }
    }

    fn op_substitute(&mut self) {
        let parts = self.rng.gen_range(0, 8);
        let template: String = (0..parts)
            .filter_map(|_| self.rng.choose(TEMPLATE_PARTS).copied())
            .collect();
        let count = self.rng.gen_range(0, 5);
        let params: Vec<String> = (0..count)
            .filter_map(|_| self.rng.choose(TEMPLATE_PARAMS).map(|p| p.to_string()))
            .collect();

        self.result.last_op = Some(RequestOp::Substitute {
            template: template.clone(),
            params: params.clone(),
        });
        self.result.substitutions += 1;

        let real = crate::userparam::substitute(&template, &params);
        let expected = shadow_substitute(&template, &params);
        if real != expected {
            self.violation(format!(
                "substitute '{}' with {:?}: shadow='{}', real='{}'",
                template, params, expected, real
            ));
        }
    }

    fn op_deny_check(&mut self) {
        let param = self.random_string(PROBE_ALPHABET, 5);

        self.result.last_op = Some(RequestOp::DenyCheck {
            param: param.clone(),
        });
        self.result.deny_checks += 1;

        let should_deny = param.chars().any(|c| DENIED_CHARACTERS.contains(c));
        let params = [param.as_str()];

        let denied = self.restrictive.build_command("probe", &params).is_err();
        if denied != should_deny {
            self.violation(format!(
                "deny check {:?}: shadow_denied={}, real_denied={}",
                param, should_deny, denied
            ));
        }

        match self.permissive.build_command("probe", &params) {
            Ok(command) if command == format!("echo {}", param) => {}
            other => self.violation(format!(
                "unsafe policy on {:?} gave {:?}",
                param, other
            )),
        }
    }

    pub fn run(&mut self, operations: usize) {
        for _ in 0..operations {
            self.run_single_op();
            if !self.result.invariant_violations.is_empty() {
                break;
            }
        }
    }

    pub fn result(&self) -> &RequestDSTResult {
        &self.result
    }
}

/// Run `num_seeds` consecutive seeds, `ops_per_seed` operations each
pub fn run_request_batch(
    start_seed: u64,
    num_seeds: usize,
    ops_per_seed: usize,
    config_fn: fn(u64) -> RequestDSTConfig,
) -> Vec<RequestDSTResult> {
    let mut results = Vec::with_capacity(num_seeds);
    for seed in start_seed..start_seed + num_seeds as u64 {
        let config = RequestDSTConfig {
            num_operations: ops_per_seed,
            ..config_fn(seed)
        };
        let ops = config.num_operations;
        let mut harness = RequestDSTHarness::new(config);
        harness.run(ops);
        results.push(harness.result().clone());
    }
    results
}

/// Per-operation totals over a batch, then one line per failing seed
pub fn summarize_request_batch(results: &[RequestDSTResult]) -> String {
    let passed = results.iter().filter(|r| r.is_success()).count();
    let sum = |f: fn(&RequestDSTResult) -> u64| -> u64 { results.iter().map(f).sum() };

    let mut summary = format!(
        "request DST: {}/{} seeds passed, {} ops\n",
        passed,
        results.len(),
        sum(|r| r.total_operations),
    );
    summary.push_str(&format!(
        "  round_trip {} | reload {} | resolve {} | substitute {} | deny {}\n",
        sum(|r| r.round_trips),
        sum(|r| r.reloads),
        sum(|r| r.resolves),
        sum(|r| r.substitutions),
        sum(|r| r.deny_checks),
    ));

    for result in results.iter().filter(|r| !r.is_success()) {
        summary.push_str(&format!(
            "  seed {} failed after {} ops: {}\n",
            result.seed,
            result.total_operations,
            result.invariant_violations.first().map_or("", String::as_str)
        ));
    }

    summary
}
