//! Command interpreter and connection management.
//!
//! Every line, whether typed at the console or replayed from the
//! configuration file, goes through [`MatrixController::handle_command`].
//! A line is one of four things: a tie assignment, a macro definition,
//! a connection directive, or garbage. Assignments may recall macros,
//! which expand recursively up to a fixed depth.

use std::collections::BTreeMap;

use matrixkit_communication::communication::{build_communicator, connection_usage};
use matrixkit_communication::protocol::{all_protocols, protocol_for_id};
use matrixkit_communication::Connection;
use matrixkit_core::{CommandError, ConnectionError, Error, RouteMap, Tie, Verdict};
use matrixkit_settings::ConfigFile;

/// Macro names are single characters, so definitions can only chain
/// through recall. The cap stops self referencing macros.
const MAX_MACRO_DEPTH: usize = 8;

/// The interpreter state: macro table, connection parameters and the
/// active device connection, all backed by one configuration file.
pub struct MatrixController {
    config: ConfigFile,
    macros: BTreeMap<char, Vec<String>>,
    connection_config: Vec<u64>,
    connection: Option<Connection>,
    config_lock: bool,
}

impl MatrixController {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            macros: BTreeMap::new(),
            connection_config: Vec::new(),
            connection: None,
            config_lock: false,
        }
    }

    /// Interpret one console line.
    pub async fn handle_command(&mut self, line: &str) {
        self.execute(line, None, true).await;
    }

    async fn execute(&mut self, line: &str, echo: Option<&str>, verbose: bool) {
        let cmd = normalize(line);
        if cmd.is_empty() {
            return;
        }
        if let Some(prefix) = echo {
            println!("{}{}", prefix, cmd);
        }

        if is_assignment(&cmd) {
            self.assign(&cmd).await;
        } else if is_macro_definition(&cmd) {
            self.define_macro(&cmd, verbose);
        } else if let Some(rest) = connection_directive(&cmd) {
            self.configure_connection(&cmd, rest).await;
        } else {
            println!("{}", invalid_command_message(&cmd));
        }
    }

    /// Resolve macros and send the resulting ties to the switch.
    async fn assign(&mut self, cmd: &str) {
        let tokens = match self.expand_macros(cmd) {
            Ok(tokens) => tokens,
            Err(e) => {
                println!("warning: {}", e);
                return;
            }
        };

        let mut routes = RouteMap::default();
        for token in &tokens {
            if token.len() < 2 {
                println!("warning: ignoring incomplete subcommand '{}'", token);
                continue;
            }
            let digits: Vec<u32> = token.chars().filter_map(|c| c.to_digit(36)).collect();
            let (input, outputs) = match digits.split_first() {
                Some(split) => split,
                None => continue,
            };
            for &output in outputs {
                routes.assign(Tie::new(*input, output));
            }
        }
        if routes.is_empty() {
            return;
        }

        let connection = match self.connection.as_mut() {
            Some(connection) => connection,
            None => {
                tracing::debug!("No active connection, dropping {} tie(s)", routes.len());
                return;
            }
        };
        let data = if routes.len() > 1 {
            connection.protocol().encode_multi(routes.ties())
        } else {
            match routes.ties().first() {
                Some(&tie) => connection.protocol().encode_single(tie),
                None => return,
            }
        };

        match connection.send(&data).await {
            Ok(()) => {}
            Err(Error::Connection(ConnectionError::Device)) => {
                println!("! device reports error");
            }
            Err(e) if e.is_timeout() => {
                println!("! no reaction from device");
            }
            Err(Error::Connection(ConnectionError::ConnectFailed { .. })) => {
                println!("! reconnect attempt failed, can't send command");
            }
            Err(e) => {
                tracing::warn!("Send failed: {}", e);
                println!("! send failed: {}", e);
            }
        }
    }

    /// Expand macro recalls in a dotted command, depth first.
    fn expand_macros(&self, cmd: &str) -> Result<Vec<String>, CommandError> {
        let mut tokens = Vec::new();
        for token in cmd.split('.') {
            self.expand_token(token, 0, &mut tokens)?;
        }
        Ok(tokens)
    }

    fn expand_token(
        &self,
        token: &str,
        depth: usize,
        out: &mut Vec<String>,
    ) -> Result<(), CommandError> {
        let mut chars = token.chars();
        if let (Some(name), None) = (chars.next(), chars.next()) {
            if let Some(values) = self.macros.get(&name) {
                if depth >= MAX_MACRO_DEPTH {
                    return Err(CommandError::MacroDepth { name });
                }
                for value in values {
                    self.expand_token(value, depth + 1, out)?;
                }
                return Ok(());
            }
        }
        out.push(token.to_string());
        Ok(())
    }

    /// Store, delete or query a macro, then persist the table.
    fn define_macro(&mut self, cmd: &str, verbose: bool) {
        let name = match cmd.chars().nth(1) {
            Some(name) => name,
            None => return,
        };
        let body = cmd.get(3..).unwrap_or("");
        let values: Vec<String> = body.split('.').map(str::to_string).collect();

        if values.first().is_some_and(|v| !v.is_empty()) {
            if verbose {
                println!("stored macro '{}': {}", name, values.join(","));
            }
            self.macros.insert(name, values);
        } else if self.macros.remove(&name).is_some() {
            if verbose {
                println!("deleted macro '{}'", name);
            }
        } else if verbose {
            println!("macro '{}' is not defined", name);
        }
        self.save_config();
    }

    /// Apply a `//...` directive: persist the parameters, tear down the
    /// old connection and bring up the new one.
    async fn configure_connection(&mut self, cmd: &str, rest: &str) {
        let tokens: Vec<&str> = rest.split('.').collect();
        if !tokens.first().is_some_and(|t| !t.is_empty()) {
            self.print_connection_help();
            return;
        }
        let params = match parse_params(cmd, &tokens) {
            Ok(params) => params,
            Err(e) => {
                tracing::debug!("{}", e);
                println!("{}", invalid_command_message(cmd));
                return;
            }
        };

        // remember the parameters even if the connection attempt fails
        self.connection_config = params;
        self.save_config();

        if let Some(mut old) = self.connection.take() {
            old.disconnect().await;
        }

        let (protocol_id, transport_params) = match self.connection_config.split_first() {
            Some((id, rest)) => (*id, rest),
            None => return,
        };
        let protocol = match protocol_for_id(protocol_id) {
            Some(protocol) => protocol,
            None => {
                self.print_connection_help();
                return;
            }
        };
        let communicator = match build_communicator(protocol.as_ref(), transport_params) {
            Ok(communicator) => communicator,
            Err(e) => {
                tracing::debug!("No transport accepted {:?}: {}", transport_params, e);
                self.print_connection_help();
                return;
            }
        };

        let mut connection = Connection::new(protocol, communicator);
        println!("* connecting to {}", connection.describe());
        match connection.connect().await {
            Ok(Verdict::Success) => println!("! connection established"),
            Ok(_) => println!("! connection failed"),
            Err(e) => {
                tracing::warn!("Connection attempt failed: {}", e);
                println!("! connection failed");
            }
        }
        self.connection = Some(connection);
    }

    fn print_connection_help(&self) {
        println!("connection types:");
        for usage in connection_usage() {
            println!("  - //proto,{}", usage);
        }
        println!("protocols:");
        for protocol in all_protocols() {
            println!("  - {} - {}", protocol.id(), protocol.name());
        }
    }

    /// Rewrite the configuration file from the current state. Skipped
    /// while the file itself is being replayed.
    fn save_config(&self) {
        if self.config_lock {
            return;
        }
        if let Err(e) = self.config.write(&self.connection_config, &self.macros) {
            println!(
                "error: failed to write configuration file '{}': {}",
                self.config.path().display(),
                e
            );
        }
    }

    /// Replay the configuration file through the interpreter. A missing
    /// file just means a fresh start.
    pub async fn load_config(&mut self) {
        let lines = match self.config.read_lines() {
            Ok(Some(lines)) => lines,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Failed to read configuration file: {}", e);
                return;
            }
        };

        println!(
            "----- loading and executing configuration file ('{}') -----",
            self.config.path().display()
        );
        self.config_lock = true;
        for line in lines {
            self.execute(&line, Some("+ "), false).await;
        }
        self.config_lock = false;
        println!("----- configuration file loaded -----");
    }

    /// Close the device connection, if any.
    pub async fn shutdown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.disconnect().await;
        }
    }
}

/// Strip comments and whitespace, unify separators, lowercase.
fn normalize(line: &str) -> String {
    let cmd = line.split('#').next().unwrap_or("");
    cmd.trim().replace(',', ".").to_lowercase()
}

/// Assignments are dotted groups of alphanumerics, e.g. `12.345`.
fn is_assignment(cmd: &str) -> bool {
    cmd.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
        && cmd.chars().any(|c| c.is_ascii_alphanumeric())
}

/// Macro definitions look like `*7*12.345`, `*7*` deletes.
fn is_macro_definition(cmd: &str) -> bool {
    let bytes = cmd.as_bytes();
    bytes.len() > 2
        && bytes[0] == b'*'
        && bytes[1].is_ascii_alphanumeric()
        && bytes[2] == b'*'
        && (bytes.len() <= 3 || is_assignment(&cmd[3..]))
}

/// Connection directives start with `//`; the rest is either empty
/// (show help) or dotted numbers.
fn connection_directive(cmd: &str) -> Option<&str> {
    let rest = cmd.strip_prefix("//")?;
    let numeric = rest.chars().all(|c| c.is_ascii_digit() || c == '.')
        && rest.chars().any(|c| c.is_ascii_digit());
    if rest.is_empty() || numeric {
        Some(rest)
    } else {
        None
    }
}

fn parse_params(cmd: &str, tokens: &[&str]) -> Result<Vec<u64>, CommandError> {
    tokens
        .iter()
        .map(|token| {
            token.parse::<u64>().map_err(|_| CommandError::Syntax {
                command: cmd.to_string(),
                reason: format!("bad connection parameter '{}'", token),
            })
        })
        .collect()
}

/// Console complaint for a line that matches no command form.
fn invalid_command_message(cmd: &str) -> String {
    format!("invalid command '{}'", cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use matrixkit_communication::protocol::LightwareProtocol;
    use matrixkit_communication::Communicator;

    #[derive(Default)]
    struct RecordingState {
        connected: bool,
        sent: Vec<Vec<u8>>,
        replies: Vec<Vec<u8>>,
    }

    // Transport double that acknowledges every frame.
    #[derive(Clone, Default)]
    struct RecordingCommunicator {
        state: Arc<Mutex<RecordingState>>,
    }

    impl RecordingCommunicator {
        fn sent(&self) -> Vec<Vec<u8>> {
            self.state.lock().unwrap().sent.clone()
        }
    }

    impl Communicator for RecordingCommunicator {
        fn connect(&mut self, _timeout: Duration) -> matrixkit_core::Result<()> {
            self.state.lock().unwrap().connected = true;
            Ok(())
        }

        fn disconnect(&mut self) -> matrixkit_core::Result<()> {
            self.state.lock().unwrap().connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.state.lock().unwrap().connected
        }

        fn send(&mut self, data: &[u8]) -> matrixkit_core::Result<usize> {
            let mut state = self.state.lock().unwrap();
            state.sent.push(data.to_vec());
            state.replies.push(b"(ok)\r\n".to_vec());
            Ok(data.len())
        }

        fn receive(&mut self) -> matrixkit_core::Result<Vec<u8>> {
            let mut state = self.state.lock().unwrap();
            if state.replies.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(state.replies.remove(0))
            }
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    fn controller_at(dir: &tempfile::TempDir) -> MatrixController {
        MatrixController::new(ConfigFile::new(dir.path().join("test.conf")))
    }

    fn wired_controller(dir: &tempfile::TempDir) -> (MatrixController, RecordingCommunicator) {
        let mut controller = controller_at(dir);
        let mock = RecordingCommunicator::default();
        controller.connection = Some(Connection::new(
            Arc::new(LightwareProtocol),
            Box::new(mock.clone()),
        ));
        (controller, mock)
    }

    fn config_content(controller: &MatrixController) -> String {
        std::fs::read_to_string(controller.config.path()).unwrap()
    }

    #[tokio::test]
    async fn test_single_tie_sends_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("12").await;

        assert_eq!(mock.sent(), vec![b"{1@2}\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_fan_out_assignment_sends_a_group() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("12,345").await;

        assert_eq!(mock.sent(), vec![b"{1@2}\r\n{3@4}\r\n{3@5}\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_later_assignment_wins_per_output() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("12.52").await;

        assert_eq!(mock.sent(), vec![b"{5@2}\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_letters_count_in_base_36() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("AB").await;

        assert_eq!(mock.sent(), vec![b"{10@11}\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_incomplete_subcommands_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("1").await;
        controller.handle_command("1..23").await;

        assert_eq!(mock.sent(), vec![b"{2@3}\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_comments_and_blank_lines_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("# just a note").await;
        controller.handle_command("   ").await;
        controller.handle_command(" 12 # tie one to two").await;

        assert_eq!(mock.sent(), vec![b"{1@2}\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_macro_recall_matches_direct_input() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("*7*12,345").await;
        controller.handle_command("7").await;
        controller.handle_command("12.345").await;

        let sent = mock.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
    }

    #[tokio::test]
    async fn test_macros_expand_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("*a*34").await;
        controller.handle_command("*7*12.a").await;
        controller.handle_command("7").await;

        assert_eq!(mock.sent(), vec![b"{1@2}\r\n{3@4}\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_self_referencing_macro_is_cut_off() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("*7*7").await;
        controller.handle_command("7").await;

        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_macro_delete_and_absent_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_at(&dir);

        controller.handle_command("*7*12").await;
        assert!(controller.macros.contains_key(&'7'));

        controller.handle_command("*7*").await;
        assert!(controller.macros.is_empty());

        // deleting again rewrites the file with identical content
        let before = config_content(&controller);
        controller.handle_command("*7*").await;
        assert_eq!(config_content(&controller), before);
    }

    #[tokio::test]
    async fn test_dot_lead_body_also_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_at(&dir);

        controller.handle_command("*7*12").await;
        controller.handle_command("*7*.34").await;

        assert!(controller.macros.is_empty());
    }

    #[tokio::test]
    async fn test_macro_table_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut controller = controller_at(&dir);
            controller.handle_command("*7*12,345").await;
            controller.handle_command("*b*9a").await;
            assert_eq!(config_content(&controller), "//\n*7*12,345\n*b*9a\n");
        }

        let mut controller = controller_at(&dir);
        controller.load_config().await;

        assert_eq!(
            controller.macros.get(&'7'),
            Some(&vec!["12".to_string(), "345".to_string()])
        );
        assert_eq!(controller.macros.get(&'b'), Some(&vec!["9a".to_string()]));
    }

    #[tokio::test]
    async fn test_replay_does_not_rewrite_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let mut controller = controller_at(&dir);
            controller.handle_command("*7*12").await;
            controller.config.path().to_path_buf()
        };
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        let mut controller = controller_at(&dir);
        controller.load_config().await;
        // untouched while the lock is held
        assert_eq!(
            std::fs::metadata(&path).unwrap().modified().unwrap(),
            before
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "//\n*7*12\n");
    }

    #[tokio::test]
    async fn test_missing_config_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_at(&dir);

        controller.load_config().await;

        assert!(controller.macros.is_empty());
        assert!(controller.connection_config.is_empty());
    }

    #[test]
    fn test_invalid_command_complaint_quotes_the_line() {
        assert_eq!(
            invalid_command_message("tie 1 to 2"),
            "invalid command 'tie 1 to 2'"
        );
    }

    #[tokio::test]
    async fn test_invalid_commands_change_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("tie 1 to 2").await;
        controller.handle_command("...").await;
        controller.handle_command("//.").await;
        controller.handle_command("*7").await;
        controller.handle_command("//1..2").await;

        assert!(mock.sent().is_empty());
        assert!(controller.macros.is_empty());
        assert!(controller.connection_config.is_empty());
    }

    #[tokio::test]
    async fn test_directive_saves_parameters_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_at(&dir);

        // protocol 9 does not exist, so this only prints help
        controller.handle_command("//9.1.2.3.4").await;

        assert_eq!(controller.connection_config, vec![9, 1, 2, 3, 4]);
        assert_eq!(config_content(&controller), "//9.1.2.3.4\n");
        assert!(controller.connection.is_none());
    }

    #[tokio::test]
    async fn test_directive_replaces_the_active_connection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mock) = wired_controller(&dir);

        controller.handle_command("//9").await;
        controller.handle_command("12").await;

        // old connection torn down, no new one came up
        assert!(mock.sent().is_empty());
        assert!(controller.connection.is_none());
    }

    // Stand-in switch that acknowledges every star-bang frame.
    fn spawn_stub_device() -> (u16, Arc<Mutex<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&received);
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            loop {
                let n = match stream.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                seen.lock().unwrap().extend_from_slice(&buf[..n]);
                if buf[..n].contains(&b'!') {
                    stream.write_all(b"Out2 In1 All\r\n").unwrap();
                }
            }
        });

        (port, received)
    }

    #[tokio::test]
    async fn test_directive_and_tie_against_a_live_socket() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_at(&dir);
        let (port, received) = spawn_stub_device();

        controller.handle_command(&format!("//2,127.0.0.1,{}", port)).await;
        controller.handle_command("12").await;
        controller.shutdown().await;

        assert_eq!(received.lock().unwrap().as_slice(), b"1*2!");
        assert_eq!(
            config_content(&controller),
            format!("//2.127.0.0.1.{}\n", port)
        );
    }
}
