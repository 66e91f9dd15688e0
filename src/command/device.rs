use clap::Subcommand;

/// Device management. These run without a selected device.
#[derive(Debug, Clone, Subcommand)]
pub enum DeviceCommand {
    /// List the VISA resources the bus reports.
    #[command(name = "devicelist", after_help = "Example: devicelist")]
    List,

    /// Select and connect to an instrument, then show its identification.
    ///
    /// Any previously selected instrument is disconnected once the new one
    /// is open. If the new one cannot be opened the selection is unchanged.
    #[command(
        name = "deviceselect",
        after_help = "Example: deviceselect \"TCPIP0::192.168.1.50::inst0::INSTR\""
    )]
    Select {
        /// VISA resource string, as shown by devicelist
        resource: String,
    },

    /// Show how a resource string is interpreted, without connecting.
    ///
    /// For manufacturer and model, select the device and run `id`.
    #[command(
        name = "deviceinfo",
        after_help = "Example: deviceinfo \"USB0::0x1AB1::0x0588::DS1ED141904883::INSTR\""
    )]
    Info {
        /// VISA resource string
        resource: String,
    },
}

/// Console housekeeping.
#[derive(Debug, Clone, Subcommand)]
pub enum ConsoleCommand {
    /// Show previously entered command lines, most recent last.
    #[command(name = "history", after_help = "Example: history 20")]
    History {
        /// Show only the last N entries
        count: Option<usize>,
    },

    /// Close the connection and leave the console.
    #[command(name = "exit", visible_alias = "quit", after_help = "Example: exit")]
    Exit,
}
