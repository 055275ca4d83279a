//! Names the renamer must never touch.

/// Runtime intrinsics of MiniScript and the GreyScript host API.
pub const INTRINSICS: &[&str] = &[
    // MiniScript core
    "abs", "acos", "asin", "atan", "ceil", "char", "cos", "floor", "log", "round", "rnd", "sign",
    "sin", "sqrt", "str", "tan", "pi", "upper", "lower", "len", "val", "code", "hash", "remove",
    "indexOf", "insert", "join", "pop", "pull", "push", "shuffle", "sort", "split", "sum",
    "values", "indexes", "hasIndex", "range", "print", "wait", "time", "yield", "slice",
    "replace", "funcRef", "map", "list", "number", "string", "version", "lastIndexOf", "trim",
    "to_int", "reverse", "typeof", "bitwise", "md5", "exit", "user_input", "clear_screen",
    "format_columns", "refString", "intrinsics", "stackTrace", "__isa", "__events",
    // GreyScript host
    "get_shell", "get_router", "get_switch", "nslookup", "whois", "is_valid_ip", "is_lan_ip",
    "include_lib", "import_code", "parent_path", "home_dir", "program_path", "active_user",
    "current_path", "current_date", "launch_path", "user_mail_address", "user_bank_number",
    "get_custom_object", "mail_login", "reset_ctf_password", "get_ctf", "show", "command_info",
    "host_computer", "connect_service", "launch", "build", "put", "start_terminal", "scp",
    "ping", "File", "touch", "create_folder", "create_user", "delete_user", "create_group",
    "delete_group", "groups", "close_program", "show_procs", "network_devices", "change_password",
    "get_ports", "local_ip", "public_ip", "get_name", "get_lan_ip", "used_ports", "port_number",
    "is_closed", "essid_name", "bssid_name", "kernel_version", "firewall_rules", "device_ports",
    "devices_lan_ip", "ping_port", "port_info", "copy", "move", "rename", "chmod", "set_content",
    "set_group", "set_owner", "get_content", "get_files", "get_folders", "name", "path", "parent",
    "is_binary", "is_folder", "has_permission", "permissions", "owner", "group", "size",
    "allow_import", "delete", "overflow", "lib_name", "scan", "scan_address", "dump_lib",
    "net_use", "aircrack", "aireplay", "airmon", "decipher", "smtp_user_list", "crypto",
    "metaxploit", "load", "rshell_client", "rshell_server", "get_object", "install_service",
    "start_service", "stop_service", "content", "exports",
];

/// Pseudo namespaces that resolve to scopes at runtime.
pub const PSEUDO_NAMESPACES: &[&str] = &["self", "super", "globals", "locals", "outer", "params"];

/// Identifiers used by the module header and wrapper.
pub const BOILERPLATE_NAMES: &[&str] = &["MODULES", "EXPORTED", "__REQUIRE", "module", "exports", "r"];

/// Every built-in exclusion, in no particular order.
pub fn default_exclusions() -> impl Iterator<Item = &'static str> {
    INTRINSICS
        .iter()
        .chain(PSEUDO_NAMESPACES)
        .chain(BOILERPLATE_NAMES)
        .copied()
}
