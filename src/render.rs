//! Prompt text for a position: move history, board grid and task templates.

use crate::board::BoardState;
use crate::client::ChatMessage;
use crate::coord::{Color, Move};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Placeholder in user templates replaced by the rendered position.
pub const MOVES_PLACEHOLDER: &str = "{moves_str}";

static RECORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.(X|O)-([A-HJ-T]\d+)").expect("move record regex"));

/// How the move history is written into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputMode {
    /// Space separated coordinates
    Basic,
    /// `1.X-Q16` lines
    Numbered,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { InputMode::Basic => "basic", InputMode::Numbered => "numbered" })
    }
}

/// Prompt family sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TaskType {
    /// General reasoning models: user prompt only
    #[value(name = "reasoning-lm")]
    ReasoningLm,
    /// Go-tuned models: system prompt with board, reasoning and win-rate format
    #[value(name = "addboard-katago-eval")]
    AddboardKatagoEval,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskType::ReasoningLm => "Reasoning_LM",
            TaskType::AddboardKatagoEval => "Addboard-KataGo-Eval",
        })
    }
}

const REASONING_LM_USER: &str = "你是一位专业的围棋棋手。你的任务是根据给定的棋局记录，分析局面信息，挑选若干可能的下一步并进行分析，推演对应的后续变化，进行合理的分析与思考，最后总结并挑选出最好的下一步位置。在给出的棋局中，\"X\"表示黑棋，\"O\"表示白棋。棋盘的大小为19x19，每个落子的坐标是一个字母加上一个数字的形式。字母为A-T(跳过I)，对应于棋盘上从左到右。数字为1-19，对应于棋盘上从下到上。\n你需要首先对当前局面进行合理的分析和思考，对后续的步骤进行合理的预测、推演和分析，并最后总结你的思考结果，选择出最合适的下一步。请进行严谨和详细的推理分析，并及时进行总结。你的总结格式为:\n<answer>\n\\boxed{下一步颜色:黑/白}\n\\boxed{下一步位置:落子位置}\n\n</answer>\n以下是当前的对局记录：\n\n{moves_str}\n\n请遵循给出的格式，预测并分析下一步的落子位置。";

const ADDBOARD_SYSTEM: &str = "你是一个精通各种围棋策略、理念和围棋下法的围棋职业棋手。你现在在进行一盘棋局的对弈，你需要根据棋盘信息对接下来的下法进行合理的预测。你的回复语言风格严谨认真而不失趣味，同时你乐于和对手进行友好的互动。你的任务是根据给定的棋局记录，分析局面信息，挑选若干可能的下一步并进行分析，推演对应的后续变化，进行合理的分析与思考，总结并挑选出最好的下一步位置，并最终形成一个有趣生动和富含思考的回复。在给出的棋局中，\"X\"表示黑棋，\"O\"表示白棋。棋盘的大小为19x19，每个落子的坐标是一个字母加上一个数字的形式。字母为A-T(跳过I)，对应于棋盘上从左到右。数字为1-19，对应于棋盘上从下到上。\n你需要首先对当前局面进行合理的分析和思考，对后续的步骤进行合理的预测、推演和分析，并最后总结你的思考结果，选择出最合适的下一步。请进行严谨详细、生动自然的推理和分析，及时进行总结，并最终输出符合格式要求的结果。你的输出格式为:\n\n<reasoning>\n你的思考过程。\n</reasoning>\n\n<answer>\n\\boxed{下一步颜色:黑/白}\n\\boxed{下一步位置:落子位置}\n\\boxed{下一步胜率:胜率}\n\n</answer>\n";

const ADDBOARD_USER: &str = "以下是当前的对局记录：\n\n{moves_str}\n\n请遵循给出的格式，预测并分析下一步的落子位置。";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system: Option<String>,
    pub user: String,
}

impl PromptTemplate {
    pub fn for_task(task: TaskType) -> Self {
        match task {
            TaskType::ReasoningLm => Self { system: None, user: REASONING_LM_USER.to_string() },
            TaskType::AddboardKatagoEval => {
                Self { system: Some(ADDBOARD_SYSTEM.to_string()), user: ADDBOARD_USER.to_string() }
            }
        }
    }

    /// Chat messages for a rendered position.
    pub fn messages(&self, position_text: &str) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            out.push(ChatMessage::system(system.clone()));
        }
        out.push(ChatMessage::user(self.user.replace(MOVES_PLACEHOLDER, position_text)));
        out
    }
}

pub fn render_moves(moves: &[Move], mode: InputMode) -> String {
    match mode {
        InputMode::Basic => moves.iter().map(Move::to_string).collect::<Vec<_>>().join(" "),
        InputMode::Numbered => moves
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}.{}-{}", i + 1, Color::for_move_number(i + 1).record_mark(), m))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn render_board(board: &BoardState) -> String {
    format!("\n\n\n当前盘面情况为:{}\n其中1表示黑棋，-1表示白棋，0表示空位。", board.to_list_string())
}

/// Move history followed by the board grid.
pub fn render_position(moves: &[Move], board: &BoardState, mode: InputMode) -> String {
    let mut s = render_moves(moves, mode);
    s.push_str(&render_board(board));
    s
}

/// Moves from a numbered record (`1.X-Q16 2.O-D4 ...`). Malformed entries are skipped.
pub fn parse_move_record(text: &str) -> Vec<(Color, Move)> {
    RECORD_RE
        .captures_iter(text)
        .filter_map(|c| {
            let color = if &c[1] == "X" { Color::Black } else { Color::White };
            c[2].parse().ok().map(|m| (color, m))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(list: &[&str]) -> Vec<Move> { list.iter().map(|m| m.parse().unwrap()).collect() }

    #[test]
    fn numbered_and_basic_modes() {
        let m = moves(&["Q16", "D4", "C3"]);
        assert_eq!(render_moves(&m, InputMode::Numbered), "1.X-Q16\n2.O-D4\n3.X-C3");
        assert_eq!(render_moves(&m, InputMode::Basic), "Q16 D4 C3");
        assert_eq!(render_moves(&[], InputMode::Numbered), "");
    }

    #[test]
    fn record_round_trips_through_numbered_text() {
        let m = moves(&["Q16", "D4", "R4"]);
        let parsed = parse_move_record(&render_moves(&m, InputMode::Numbered));
        assert_eq!(parsed.iter().map(|(_, mv)| *mv).collect::<Vec<_>>(), m);
        assert_eq!(parsed[1].0, Color::White);
        assert!(parse_move_record("1.X-Z4 2.O-Q25").is_empty());
    }

    #[test]
    fn templates_substitute_position() {
        let t = PromptTemplate::for_task(TaskType::AddboardKatagoEval);
        let msgs = t.messages("1.X-Q16");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[1].content.contains("1.X-Q16"));
        assert!(!msgs[1].content.contains(MOVES_PLACEHOLDER));

        let t = PromptTemplate::for_task(TaskType::ReasoningLm);
        let msgs = t.messages("Q16");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, "user");
        assert!(msgs[0].content.contains("\\boxed{下一步位置:落子位置}"));
    }

    #[test]
    fn board_text_embeds_grid() {
        let text = render_board(&BoardState::empty());
        assert!(text.starts_with("\n\n\n当前盘面情况为:[[0, 0"));
        assert!(text.ends_with("0表示空位。"));
    }
}
