//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub fn default_config_toml() -> &'static str {
    r##"# GridOps Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[model]
# default = "openai:gpt-4o"     # provider:model, overridden by the CLI argument
# max_output_tokens = 2000      # 1-32000
# request_timeout_secs = 120    # 1-600

[providers]
# API keys are read from OPENAI_API_KEY, ANTHROPIC_API_KEY,
# GOOGLE_API_KEY (or GEMINI_API_KEY) and MISTRAL_API_KEY.
# openai_base_url = "https://api.openai.com/v1"
# anthropic_base_url = "https://api.anthropic.com/v1"
# google_base_url = "https://generativelanguage.googleapis.com/v1beta"
# mistral_base_url = "https://api.mistral.ai/v1"

[server]
# command = ""                  # empty: python for .py, node for .js
# args = []
# protocol_version = "2024-11-05"
# request_timeout_secs = 60     # 1-600

[host]
# system_prompt = "You are a Grid Operations Assistant, ..."

[history]
# max_messages = 20             # 0 = unbounded, otherwise 2-1000

[context]
# max_analyses = 100            # 0 = unbounded, max 10000

[logging]
# level = "info"                # trace, debug, info, warn, error
"##
}
