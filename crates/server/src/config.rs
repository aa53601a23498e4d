// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_address")]
    pub address: String,
    pub port: u16,
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.address, self.port).parse()
    }
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listeners")]
    pub listeners: Vec<ListenerConfig>,
    /// Directories searched for program source files (`*.msc`) during seeding; the file stem
    /// names the program, case-insensitively.
    #[serde(default = "default_program_dirs")]
    pub program_dirs: Vec<PathBuf>,
}

fn default_listeners() -> Vec<ListenerConfig> {
    vec![ListenerConfig {
        protocol: Protocol::Tcp,
        address: default_address(),
        port: 8888,
    }]
}

fn default_program_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("seed")]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listeners: default_listeners(),
            program_dirs: default_program_dirs(),
        }
    }
}
